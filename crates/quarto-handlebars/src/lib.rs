/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Handlebars-style template expansion for Quarto web pages.
//!
//! Templates are plain text with `{{...}}` tags, expanded against a
//! per-request context. It supports:
//!
//! - Variable paths: `{{user.profile.name}}`
//! - Logic helpers: `{{and (eq user.role "admin") user.isActive}}`
//! - Block helpers: `{{#if}}`, `{{#unless}}`, `{{#each}}`, `{{#with}}`
//! - Dates: `{{date.format published format="%DATE%" timezone="browser"}}`
//! - Components: `{{#component "card" title="Untitled"}}...{{/component}}`
//!   defined once, invoked as `{{components.card title="Hello"}}`
//! - Variables: `{{let label=(if admin "Admin" "Member")}}` then `{{vars.label}}`
//! - Includes: `{{file.include "partials/header" active="home"}}`
//! - Translations: `{{t "nav.home"}}`
//! - Comments: `{{!-- ignored --}}`
//!
//! # Architecture
//!
//! A [`HandlebarEngine`] is built once from an [`EngineConfig`] and shared
//! across requests. Each request gets a [`RequestScope`] holding everything
//! that must not leak between requests: defined components, the component
//! call stack, the cached base context and collected diagnostics.
//!
//! Expansion never fails. A tag that cannot be evaluated renders as
//! `<!-- Error: ... -->` in place and is recorded on the scope.
//!
//! # Example
//!
//! ```ignore
//! use quarto_handlebars::{EngineConfig, HandlebarEngine, RequestScope, StaticRequest, TemplateValue};
//!
//! let engine = HandlebarEngine::new(EngineConfig::default());
//! let request = StaticRequest::new().with_hostname("example.org");
//! let mut scope = RequestScope::new(&request);
//!
//! let output = engine.expand(&mut scope, "Hello from {{url.hostname}}!", &TemplateValue::Null);
//! assert_eq!(output, "Hello from example.org!");
//! ```

pub mod ast;
pub mod components;
pub mod config;
pub mod context;
pub mod context_builder;
pub mod engine;
pub mod error;
mod evaluator;
pub mod helpers;
pub mod parser;
pub mod path;
pub mod request;
pub mod resolver;
pub mod scope;
pub mod tag;
pub mod tokenizer;
pub mod value;

// Re-export main types at crate root
pub use ast::{Block, Call, Comment, Expr, Expression, Invalid, Literal, PathExpr, TemplateNode};
pub use components::{CallStack, ComponentDefinition, ComponentRegistry};
pub use config::{AppConfig, AssetsConfig, ConfigError, EngineConfig};
pub use context::TemplateContext;
pub use context_builder::build_base_context;
pub use engine::{HandlebarEngine, LoadComponentsResult};
pub use error::{TemplateError, TemplateResult};
pub use helpers::{BuiltinHelper, CustomHelper, HelperArgs, HelperRegistry};
pub use parser::Template;
pub use request::{Request, StaticRequest};
pub use resolver::{AssetResolver, FileSystemResolver, MemoryResolver, NullResolver};
pub use scope::{Diagnostic, DiagnosticCollector, RequestScope};
pub use tokenizer::Span;
pub use value::{TemplateValue, ValueMap};
