/*
 * scope.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Per-request expansion state.
//!
//! A [`RequestScope`] is created for each inbound request and threaded
//! through every expansion call made while serving it. It owns:
//!
//! 1. **Components**: the registry of definitions seen so far
//! 2. **Call stack**: components currently being expanded
//! 3. **Base context**: built on first use, then shared by nested calls
//! 4. **Diagnostics**: every error marker emitted, with its depth
//!
//! Nothing in a scope is visible to any other scope.

use crate::components::{CallStack, ComponentRegistry};
use crate::context::TemplateContext;
use crate::error::{TemplateError, error_marker};
use crate::request::Request;
use crate::tokenizer::Span;
use std::sync::Arc;
use tracing::warn;

/// An error that was rendered into the output as a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// Expansion depth the error occurred at.
    pub depth: usize,
    /// Byte range of the failing tag in the template expanded at `depth`.
    /// `None` when the error concerns the template as a whole.
    pub span: Option<Span>,
}

/// Collector for diagnostics produced during expansion.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// State for one request's worth of expansions.
pub struct RequestScope<'r> {
    request: &'r dyn Request,
    pub(crate) components: ComponentRegistry,
    pub(crate) call_stack: CallStack,
    base_context: Option<Arc<TemplateContext>>,
    diagnostics: DiagnosticCollector,
}

impl<'r> RequestScope<'r> {
    pub fn new(request: &'r dyn Request) -> Self {
        Self {
            request,
            components: ComponentRegistry::new(),
            call_stack: CallStack::new(),
            base_context: None,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    pub fn request(&self) -> &'r dyn Request {
        self.request
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// The base context built for this request, if any.
    pub fn cached_context(&self) -> Option<&Arc<TemplateContext>> {
        self.base_context.as_ref()
    }

    pub(crate) fn cache_context(&mut self, context: Arc<TemplateContext>) {
        self.base_context = Some(context);
    }

    /// Drop the cached base so the next expansion rebuilds it.
    pub fn clear_cached_context(&mut self) {
        self.base_context = None;
    }

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    /// Record an error and return the marker to render in its place.
    pub(crate) fn report(
        &mut self,
        error: &TemplateError,
        depth: usize,
        span: Option<Span>,
    ) -> String {
        self.report_message(error.to_string(), depth, span)
    }

    pub(crate) fn report_message(
        &mut self,
        message: String,
        depth: usize,
        span: Option<Span>,
    ) -> String {
        match span {
            Some(span) => warn!(depth, start = span.start, end = span.end, "{message}"),
            None => warn!(depth, "{message}"),
        }
        let marker = error_marker(&message);
        self.diagnostics.add(Diagnostic {
            message,
            depth,
            span,
        });
        marker
    }
}

impl std::fmt::Debug for RequestScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("components", &self.components)
            .field("call_stack", &self.call_stack)
            .field("has_base_context", &self.base_context.is_some())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}
