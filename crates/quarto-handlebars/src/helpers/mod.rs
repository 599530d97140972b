/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helper lookup.
//!
//! Built-in helpers are a closed set resolved by a static name match.
//! Applications add open-ended helpers through [`HelperRegistry::register`];
//! those can never replace a built-in.

pub mod date;
pub mod logical;

pub use date::DateHelper;
pub use logical::LogicalOp;

use crate::error::TemplateResult;
use crate::request::Request;
use crate::value::{TemplateValue, ValueMap};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Prefix that turns a tag into a component invocation.
pub const COMPONENT_PREFIX: &str = "components.";

/// Evaluated arguments passed to a helper.
pub struct HelperArgs<'a> {
    /// Positional arguments, in order.
    pub params: &'a [TemplateValue],
    /// `key=value` arguments, in order.
    pub hash: &'a ValueMap,
    pub request: &'a dyn Request,
}

impl<'a> HelperArgs<'a> {
    pub fn param(&self, index: usize) -> Option<&'a TemplateValue> {
        self.params.get(index)
    }


    /// A hash argument, if it is a string.
    pub fn hash_str(&self, key: &str) -> Option<&'a str> {
        self.hash.get(key).and_then(TemplateValue::as_str)
    }
}

/// An application-supplied helper.
pub type CustomHelper =
    Arc<dyn Fn(&HelperArgs<'_>) -> TemplateResult<TemplateValue> + Send + Sync>;

/// The built-in helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinHelper {
    Logical(LogicalOp),
    If,
    Unless,
    Each,
    With,
    Date(DateHelper),
    /// `{{#component "name"}}`: defines a component.
    Component,
    Let,
    FileInclude,
    Translate,
}

impl BuiltinHelper {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(op) = LogicalOp::from_name(name) {
            return Some(BuiltinHelper::Logical(op));
        }
        if let Some(date) = DateHelper::from_name(name) {
            return Some(BuiltinHelper::Date(date));
        }
        Some(match name {
            "if" => BuiltinHelper::If,
            "unless" => BuiltinHelper::Unless,
            "each" => BuiltinHelper::Each,
            "with" => BuiltinHelper::With,
            "component" => BuiltinHelper::Component,
            "let" => BuiltinHelper::Let,
            "file.include" => BuiltinHelper::FileInclude,
            "t" => BuiltinHelper::Translate,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinHelper::Logical(op) => op.name(),
            BuiltinHelper::Date(date) => date.name(),
            BuiltinHelper::If => "if",
            BuiltinHelper::Unless => "unless",
            BuiltinHelper::Each => "each",
            BuiltinHelper::With => "with",
            BuiltinHelper::Component => "component",
            BuiltinHelper::Let => "let",
            BuiltinHelper::FileInclude => "file.include",
            BuiltinHelper::Translate => "t",
        }
    }
}

/// What a tag name refers to.
#[derive(Clone)]
pub enum Helper {
    Builtin(BuiltinHelper),
    /// `components.<name>`; holds the name after the prefix.
    Component(String),
    Custom(CustomHelper),
    Unknown,
}

/// Registry of application helpers.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    custom: HashMap<String, CustomHelper>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a helper under `name`.
    ///
    /// Names taken by built-ins or the component prefix are refused with a
    /// warning; returns whether the helper was registered.
    pub fn register<F>(&mut self, name: impl Into<String>, helper: F) -> bool
    where
        F: Fn(&HelperArgs<'_>) -> TemplateResult<TemplateValue> + Send + Sync + 'static,
    {
        let name = name.into();
        if BuiltinHelper::from_name(&name).is_some() || name.starts_with(COMPONENT_PREFIX) {
            warn!(helper = %name, "custom helper shadows a built-in and will be ignored");
            return false;
        }
        self.custom.insert(name, Arc::new(helper));
        true
    }

    /// Resolve a tag name.
    pub fn lookup(&self, name: &str) -> Helper {
        if let Some(builtin) = BuiltinHelper::from_name(name) {
            return Helper::Builtin(builtin);
        }
        if let Some(component) = name.strip_prefix(COMPONENT_PREFIX) {
            return Helper::Component(component.to_string());
        }
        match self.custom.get(name) {
            Some(helper) => Helper::Custom(Arc::clone(helper)),
            None => Helper::Unknown,
        }
    }
}

impl std::fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("HelperRegistry")
            .field("custom", &names)
            .finish()
    }
}
