/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The expansion engine.
//!
//! [`HandlebarEngine`] holds everything that is fixed after setup:
//! configuration, custom helpers and the asset resolver. It is shared
//! across requests; all per-request state lives on the [`RequestScope`]
//! passed to each call.

use crate::components::ComponentDefinition;
use crate::config::EngineConfig;
use crate::context::TemplateContext;
use crate::context_builder::build_base_context;
use crate::error::{TemplateError, TemplateResult};
use crate::evaluator::Evaluator;
use crate::helpers::{HelperArgs, HelperRegistry};
use crate::parser::Template;
use crate::resolver::{AssetResolver, FileSystemResolver, NullResolver};
use crate::scope::RequestScope;
use crate::value::TemplateValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Outcome of [`HandlebarEngine::load_components`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadComponentsResult {
    pub success: bool,
    /// Definitions found in the asset, by normalized name.
    pub components: IndexMap<String, ComponentDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadComponentsResult {
    fn failure(error: &TemplateError) -> Self {
        Self {
            success: false,
            components: IndexMap::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Handlebars-style template expansion engine.
pub struct HandlebarEngine {
    config: EngineConfig,
    helpers: HelperRegistry,
    assets: Box<dyn AssetResolver + Send + Sync>,
}

impl HandlebarEngine {
    /// Create an engine. Assets load from `config.assets.root` when set.
    pub fn new(config: EngineConfig) -> Self {
        let assets: Box<dyn AssetResolver + Send + Sync> = match &config.assets.root {
            Some(root) => Box::new(
                FileSystemResolver::new(root)
                    .with_default_extension(config.assets.default_extension.clone()),
            ),
            None => Box::new(NullResolver),
        };
        Self {
            config,
            helpers: HelperRegistry::new(),
            assets,
        }
    }

    /// Replace the asset resolver.
    pub fn with_assets(mut self, assets: impl AssetResolver + Send + Sync + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn assets(&self) -> &dyn AssetResolver {
        self.assets.as_ref()
    }

    /// Add a custom helper. Returns `false` if `name` belongs to a built-in.
    pub fn register_helper<F>(&mut self, name: impl Into<String>, helper: F) -> bool
    where
        F: Fn(&HelperArgs<'_>) -> TemplateResult<TemplateValue> + Send + Sync + 'static,
    {
        self.helpers.register(name, helper)
    }

    /// Expand a template for a request.
    ///
    /// `additional` is layered over the request's base context; map entries
    /// win over base keys of the same name. Errors never escape: each failing
    /// tag is replaced by an `<!-- Error: ... -->` marker and recorded on the
    /// scope.
    pub fn expand(
        &self,
        scope: &mut RequestScope<'_>,
        template: &str,
        additional: &TemplateValue,
    ) -> String {
        let output = self.expand_at_depth(scope, template, additional, 0);
        if !scope.call_stack.is_empty() {
            error!(
                remaining = scope.call_stack.len(),
                "component call stack not empty after expansion"
            );
            scope.call_stack.clear();
        }
        output
    }

    /// Expand at a given nesting depth. Components and includes call this
    /// with `depth + 1`.
    pub fn expand_at_depth(
        &self,
        scope: &mut RequestScope<'_>,
        template: &str,
        additional: &TemplateValue,
        depth: usize,
    ) -> String {
        let max_depth = self.config.max_depth;
        if depth > max_depth {
            return scope.report(&TemplateError::DepthExceeded { max_depth }, depth, None);
        }
        trace!(depth, len = template.len(), "expanding template");

        let base = self.base_context(scope, depth);
        let mut context = TemplateContext::layered_on(&base);
        context.extend_from_value(additional);

        let template = Template::compile(template);
        Evaluator::new(self, scope, depth).render(template.nodes(), &Arc::new(context))
    }

    /// Load a component library asset into the scope's registry.
    ///
    /// The asset is expanded with an empty registry and its output is
    /// discarded; whatever it defines is then merged into `scope`, replacing
    /// same-named definitions.
    pub fn load_components(
        &self,
        scope: &mut RequestScope<'_>,
        asset_path: &str,
        context: &TemplateValue,
    ) -> LoadComponentsResult {
        let source = match self.assets.load_asset(asset_path) {
            Ok(source) => source,
            Err(err) => {
                warn!(asset = asset_path, "failed to load components: {err}");
                return LoadComponentsResult::failure(&err);
            }
        };

        let outer = std::mem::take(&mut scope.components);
        self.expand(scope, &source, context);
        let loaded = std::mem::replace(&mut scope.components, outer);

        debug!(
            asset = asset_path,
            count = loaded.len(),
            "loaded component library"
        );
        let components = loaded.clone().into_definitions();
        scope.components.extend(loaded);
        LoadComponentsResult {
            success: true,
            components,
            error: None,
        }
    }

    /// The base context for `scope`, built on first use.
    fn base_context(&self, scope: &mut RequestScope<'_>, depth: usize) -> Arc<TemplateContext> {
        if let Some(base) = scope.cached_context() {
            return Arc::clone(base);
        }
        if depth > 0 {
            debug!(depth, "base context missing in nested expansion, rebuilding");
        } else {
            debug!("building base context");
        }
        let base = Arc::new(build_base_context(scope.request(), &self.config));
        scope.cache_context(Arc::clone(&base));
        base
    }
}

impl std::fmt::Debug for HandlebarEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarEngine")
            .field("config", &self.config)
            .field("helpers", &self.helpers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::StaticRequest;
    use crate::resolver::MemoryResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine() -> HandlebarEngine {
        HandlebarEngine::new(EngineConfig::default())
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HandlebarEngine>();
    }

    #[test]
    fn test_additional_context_overrides_base() {
        let engine = engine();
        let request = StaticRequest::new().with_hostname("example.org");
        let mut scope = RequestScope::new(&request);
        let out = engine.expand(
            &mut scope,
            "{{url.hostname}} {{user}}",
            &TemplateValue::from(json!({"user": "override"})),
        );
        assert_eq!(out, "example.org override");
    }

    #[test]
    fn test_base_context_is_cached() {
        let engine = engine();
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        engine.expand(&mut scope, "{{url.href}}", &TemplateValue::Null);
        let first = Arc::clone(scope.cached_context().unwrap());
        engine.expand(&mut scope, "{{url.href}}", &TemplateValue::Null);
        assert!(Arc::ptr_eq(&first, scope.cached_context().unwrap()));
    }

    #[test]
    fn test_nested_expansion_rebuilds_missing_base() {
        let engine = engine();
        let request = StaticRequest::new().with_hostname("nested.test");
        let mut scope = RequestScope::new(&request);
        let out = engine.expand_at_depth(&mut scope, "{{url.hostname}}", &TemplateValue::Null, 3);
        assert_eq!(out, "nested.test");
        assert!(scope.cached_context().is_some());
    }

    #[test]
    fn test_depth_limit() {
        let mut config = EngineConfig::default();
        config.max_depth = 2;
        let engine = HandlebarEngine::new(config);
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        assert_eq!(
            engine.expand_at_depth(&mut scope, "x", &TemplateValue::Null, 3),
            "<!-- Error: Maximum template nesting depth (2) exceeded -->"
        );
        assert_eq!(scope.diagnostics().len(), 1);
    }

    #[test]
    fn test_component_depth_limit() {
        let mut config = EngineConfig::default();
        config.max_component_depth = 2;
        let engine = HandlebarEngine::new(config);
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        let out = engine.expand(
            &mut scope,
            concat!(
                r#"{{#component "a"}}A{{components.b}}{{/component}}"#,
                r#"{{#component "b"}}B{{components.c}}{{/component}}"#,
                r#"{{#component "c"}}C{{/component}}"#,
                "{{components.a}}",
            ),
            &TemplateValue::Null,
        );
        assert_eq!(
            out,
            "AB<!-- Error: Maximum component nesting depth (2) exceeded at c -->"
        );
        assert!(scope.call_stack().is_empty());
    }

    #[test]
    fn test_custom_helper() {
        let mut engine = engine();
        engine.register_helper("shout", |args| {
            let text = args.param(0).map(TemplateValue::render).unwrap_or_default();
            let suffix = args.hash_str("suffix").unwrap_or("");
            Ok(TemplateValue::from(format!("{}{suffix}", text.to_uppercase())))
        });
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        assert_eq!(
            engine.expand(
                &mut scope,
                r#"{{shout name suffix="!"}}"#,
                &TemplateValue::from(json!({"name": "hi"}))
            ),
            "HI!"
        );
    }

    #[test]
    fn test_custom_helper_error_becomes_marker() {
        let mut engine = engine();
        engine.register_helper("fail", |_| Err(TemplateError::usage("fail", "always fails")));
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        assert_eq!(
            engine.expand(&mut scope, "a{{fail 1}}b", &TemplateValue::Null),
            "a<!-- Error: Invalid use of helper 'fail': always fails -->b"
        );
    }

    #[test]
    fn test_load_components() {
        let assets = MemoryResolver::with_assets([(
            "components/ui",
            r#"{{#component "primary-button" label="OK"}}<button>{{label}}</button>{{/component}}ignored output"#,
        )]);
        let engine = engine().with_assets(assets);
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);

        let result = engine.load_components(&mut scope, "components/ui", &TemplateValue::Null);
        assert!(result.success);
        assert_eq!(result.error, None);
        assert_eq!(
            result.components.keys().collect::<Vec<_>>(),
            vec!["primaryButton"]
        );
        assert!(scope.components().contains("primaryButton"));
        assert_eq!(
            engine.expand(&mut scope, "{{components.primary-button}}", &TemplateValue::Null),
            "<button>OK</button>"
        );
    }

    #[test]
    fn test_load_components_keeps_existing_definitions() {
        let assets = MemoryResolver::with_assets([(
            "lib",
            r#"{{#component "b"}}lib-b{{/component}}"#,
        )]);
        let engine = engine().with_assets(assets);
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        engine.expand(
            &mut scope,
            r#"{{#component "a"}}page-a{{/component}}"#,
            &TemplateValue::Null,
        );

        let result = engine.load_components(&mut scope, "lib", &TemplateValue::Null);
        assert_eq!(result.components.len(), 1);
        assert_eq!(scope.components().len(), 2);
    }

    #[test]
    fn test_load_components_missing_asset() {
        let engine = engine();
        let request = StaticRequest::new();
        let mut scope = RequestScope::new(&request);
        let result = engine.load_components(&mut scope, "nope", &TemplateValue::Null);
        assert_eq!(
            result,
            LoadComponentsResult {
                success: false,
                components: IndexMap::new(),
                error: Some("File not found: nope".to_string()),
            }
        );
        let json = serde_json::to_string_pretty(&result).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "success": false,
          "components": {},
          "error": "File not found: nope"
        }
        "#);
    }
}
