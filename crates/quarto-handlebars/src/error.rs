/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template parsing and expansion.
//!
//! Expansion never hands these to the caller. The evaluator turns each one
//! into an inline `<!-- Error: ... -->` marker and records it on the
//! request scope.

use thiserror::Error;

/// Errors that can occur while expanding a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed tag syntax.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A tag named a helper that does not exist.
    #[error("Unknown helper: {name}")]
    UnknownHelper { name: String },

    /// A helper was called with the wrong shape (block vs inline, missing arguments).
    #[error("Invalid use of helper '{helper}': {message}")]
    HelperUsage { helper: String, message: String },

    /// A component definition used a name outside the identifier grammar.
    #[error("Invalid component name: \"{name}\"")]
    InvalidComponentName { name: String },

    /// Invocation of a component that was never defined in this request.
    #[error("Component not found: {name}")]
    ComponentNotFound { name: String },

    /// A component invoked itself, directly or transitively.
    #[error("Circular component reference: {chain}")]
    CircularComponent { chain: String },

    /// The component call stack reached its maximum length.
    #[error("Maximum component nesting depth ({max_depth}) exceeded at {name}")]
    ComponentDepthExceeded { name: String, max_depth: usize },

    /// Nested expansion went deeper than the configured ceiling.
    #[error("Maximum template nesting depth ({max_depth}) exceeded")]
    DepthExceeded { max_depth: usize },

    /// Blocks or subexpressions nested deeper than a single template allows.
    #[error("Maximum expression nesting depth ({max_depth}) exceeded")]
    NestingTooDeep { max_depth: usize },

    /// An asset (included fragment or component file) could not be located.
    #[error("File not found: {path}")]
    AssetNotFound { path: String },

    /// I/O error (e.g., reading an asset).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        TemplateError::Parse {
            message: message.into(),
        }
    }

    /// Create a helper usage error.
    pub fn usage(helper: impl Into<String>, message: impl Into<String>) -> Self {
        TemplateError::HelperUsage {
            helper: helper.into(),
            message: message.into(),
        }
    }

    /// Render this error as the inline marker that replaces the failing tag.
    pub fn marker(&self) -> String {
        error_marker(&self.to_string())
    }
}

/// Format an inline error marker.
///
/// `--` inside the message would terminate the HTML comment early, so it is
/// broken up.
pub fn error_marker(message: &str) -> String {
    format!("<!-- Error: {} -->", message.replace("--", "- -"))
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
