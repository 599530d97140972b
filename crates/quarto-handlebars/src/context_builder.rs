/*
 * context_builder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! System context built from the request and configuration.

use crate::config::EngineConfig;
use crate::context::TemplateContext;
use crate::request::Request;
use crate::value::{TemplateValue, ValueMap};

/// Build the base context every template of a request sees.
///
/// Keys: `user`, `app`, `url`, `i18n`.
pub fn build_base_context(request: &dyn Request, config: &EngineConfig) -> TemplateContext {
    let mut context = TemplateContext::new();

    context.insert("user", request.user().unwrap_or(TemplateValue::Null));

    let settings: ValueMap = config
        .app
        .settings
        .iter()
        .map(|(k, v)| (k.clone(), TemplateValue::from(v.clone())))
        .collect();
    context.insert(
        "app",
        TemplateValue::map([
            ("name", TemplateValue::from(config.app.name.as_str())),
            ("version", TemplateValue::from(config.app.version.as_str())),
            ("settings", TemplateValue::Map(settings)),
        ]),
    );

    let protocol = request.protocol();
    let hostname = request.hostname();
    let path = request.path();
    let origin = format!("{protocol}://{hostname}");
    let href = format!("{origin}{path}");
    context.insert(
        "url",
        TemplateValue::map([
            ("protocol", protocol.to_string()),
            ("hostname", hostname.to_string()),
            ("path", path.to_string()),
            ("origin", origin),
            ("href", href),
        ]),
    );

    let locale = request
        .locale()
        .unwrap_or(config.default_locale.as_str())
        .to_string();
    context.insert("i18n", TemplateValue::map([("locale", locale)]));

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::StaticRequest;
    use pretty_assertions::assert_eq;

    fn lookup<'a>(context: &'a TemplateContext, path: &[&str]) -> Option<&'a TemplateValue> {
        context.get_path(path)
    }

    #[test]
    fn test_url_keys() {
        let request = StaticRequest::new()
            .with_protocol("https")
            .with_hostname("docs.example.org")
            .with_path("/guide/intro");
        let context = build_base_context(&request, &EngineConfig::default());

        assert_eq!(
            lookup(&context, &["url", "origin"]),
            Some(&TemplateValue::from("https://docs.example.org"))
        );
        assert_eq!(
            lookup(&context, &["url", "href"]),
            Some(&TemplateValue::from("https://docs.example.org/guide/intro"))
        );
        assert_eq!(
            lookup(&context, &["url", "path"]),
            Some(&TemplateValue::from("/guide/intro"))
        );
    }

    #[test]
    fn test_user_defaults_to_null() {
        let context = build_base_context(&StaticRequest::new(), &EngineConfig::default());
        assert_eq!(context.get("user"), Some(&TemplateValue::Null));

        let request =
            StaticRequest::new().with_user(TemplateValue::map([("name", "Ada")]));
        let context = build_base_context(&request, &EngineConfig::default());
        assert_eq!(
            lookup(&context, &["user", "name"]),
            Some(&TemplateValue::from("Ada"))
        );
    }

    #[test]
    fn test_app_settings_and_locale() {
        let mut config = EngineConfig::default();
        config.app.name = "Docs".into();
        config
            .app
            .settings
            .insert("theme".into(), serde_json::json!("dark"));
        config.default_locale = "fr".into();

        let context = build_base_context(&StaticRequest::new(), &config);
        assert_eq!(
            lookup(&context, &["app", "settings", "theme"]),
            Some(&TemplateValue::from("dark"))
        );
        assert_eq!(lookup(&context, &["app", "name"]), Some(&TemplateValue::from("Docs")));
        assert_eq!(
            lookup(&context, &["i18n", "locale"]),
            Some(&TemplateValue::from("fr"))
        );

        let request = StaticRequest::new().with_locale("ja");
        let context = build_base_context(&request, &config);
        assert_eq!(
            lookup(&context, &["i18n", "locale"]),
            Some(&TemplateValue::from("ja"))
        );
    }
}
