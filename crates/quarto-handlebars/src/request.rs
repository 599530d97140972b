/*
 * request.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Request collaborator.
//!
//! The engine only needs a narrow view of the inbound request: who the user
//! is, where the request was addressed, headers and cookies, and a
//! translation function. [`Request`] describes that view; [`StaticRequest`]
//! is a plain implementation for tests, tooling and embedding.

use crate::value::TemplateValue;
use std::collections::HashMap;

/// What the expansion engine reads from an inbound request.
pub trait Request {
    /// Session user data, if any.
    fn user(&self) -> Option<TemplateValue> {
        None
    }

    /// Request protocol without the `://` (e.g. `https`).
    fn protocol(&self) -> &str;

    /// Host name the request was addressed to.
    fn hostname(&self) -> &str;

    /// Request path (e.g. `/docs/intro`).
    fn path(&self) -> &str {
        "/"
    }

    /// Header value by case-insensitive name.
    fn header(&self, name: &str) -> Option<&str>;

    /// Already-parsed cookies, when the server framework provides them.
    fn cookies(&self) -> Option<&HashMap<String, String>> {
        None
    }

    /// A single cookie: from [`Request::cookies`] when available, otherwise
    /// parsed from the raw `Cookie` header.
    fn cookie(&self, name: &str) -> Option<String> {
        if let Some(cookies) = self.cookies() {
            return cookies.get(name).cloned();
        }
        self.header("cookie")
            .and_then(|raw| parse_cookie_header(raw).remove(name))
    }

    /// Translate an i18n key. Untranslated keys come back unchanged.
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }

    /// Preferred locale, when known.
    fn locale(&self) -> Option<&str> {
        None
    }
}

/// Parse a raw `Cookie` header (`a=1; b=2`) into a map.
///
/// Pairs without `=` are skipped; surrounding double quotes on values are
/// removed.
pub fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// A request assembled up front.
#[derive(Debug, Clone)]
pub struct StaticRequest {
    protocol: String,
    hostname: String,
    path: String,
    headers: HashMap<String, String>,
    cookies: Option<HashMap<String, String>>,
    user: Option<TemplateValue>,
    translations: HashMap<String, String>,
    locale: Option<String>,
}

impl Default for StaticRequest {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            hostname: "localhost".to_string(),
            path: "/".to_string(),
            headers: HashMap::new(),
            cookies: None,
            user: None,
            translations: HashMap::new(),
            locale: None,
        }
    }
}

impl StaticRequest {
    /// A request for `http://localhost/`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Add a header. Names are stored lower-cased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Add a parsed cookie. Once any cookie is added this way the raw
    /// `Cookie` header is no longer consulted.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_user(mut self, user: TemplateValue) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_translation(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.translations.insert(key.into(), text.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

impl Request for StaticRequest {
    fn user(&self) -> Option<TemplateValue> {
        self.user.clone()
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn cookies(&self) -> Option<&HashMap<String, String>> {
        self.cookies.as_ref()
    }

    fn translate(&self, key: &str) -> String {
        self.translations
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}
