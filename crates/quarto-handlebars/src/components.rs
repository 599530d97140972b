/*
 * components.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Component definitions and the invocation call stack.
//!
//! Components are named template bodies with default parameters, defined
//! with `{{#component "name" k=v}}...{{/component}}` and invoked with
//! `{{components.name k=v}}`. Both the registry and the call stack belong to
//! a single request scope.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static NAME_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap());

/// Whether `name` is a valid component name.
///
/// Dot-separated segments of ASCII letters, digits and hyphens, where no
/// segment is empty or begins or ends with a hyphen.
pub fn is_valid_component_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(|segment| NAME_SEGMENT.is_match(segment))
}

/// Convert each hyphenated segment to camelCase.
///
/// `ui.buttons.primary-large` becomes `ui.buttons.primaryLarge`. Names that
/// are already camelCase pass through unchanged.
pub fn normalize_component_name(name: &str) -> String {
    name.split('.')
        .map(camel_case)
        .collect::<Vec<_>>()
        .join(".")
}

fn camel_case(segment: &str) -> String {
    let mut parts = segment.split('-');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// A defined component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDefinition {
    /// Normalized name.
    pub name: String,
    /// Default parameters, as rendered strings.
    pub defaults: IndexMap<String, String>,
    /// Unexpanded body template.
    pub body: String,
}

/// Components defined during one request, keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any earlier one with the same name.
    pub fn define(&mut self, definition: ComponentDefinition) {
        self.components.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDefinition> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Add every definition from `other`; `other` wins on name collisions.
    pub fn extend(&mut self, other: ComponentRegistry) {
        self.components.extend(other.components);
    }

    pub fn into_definitions(self) -> IndexMap<String, ComponentDefinition> {
        self.components
    }
}

/// Names of the components currently being expanded, outermost first.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<String>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.frames.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame == name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Render the stack followed by `name`, e.g. `a -> b -> a`.
    pub fn chain_with(&self, name: &str) -> String {
        let mut chain: Vec<&str> = self.frames.iter().map(String::as_str).collect();
        chain.push(name);
        chain.join(" -> ")
    }
}
