/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Layered variable context.
//!
//! A [`TemplateContext`] holds one layer of bindings and an optional shared
//! parent. Overrides (caller-supplied additional context, component
//! parameters, loop bindings) always go into a new child layer, so the
//! cached per-request base is never touched.

use crate::value::{TemplateValue, ValueMap};
use std::sync::Arc;

/// A context for template evaluation containing variable bindings.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Variable bindings at this level.
    variables: ValueMap,

    /// Parent layer, shared with every other child of it.
    parent: Option<Arc<TemplateContext>>,
}

impl TemplateContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty layer on top of `parent`.
    ///
    /// Bindings inserted into the child shadow the parent's top-level keys.
    pub fn layered_on(parent: &Arc<TemplateContext>) -> Self {
        Self {
            variables: ValueMap::new(),
            parent: Some(Arc::clone(parent)),
        }
    }

    /// Insert a variable into this layer.
    pub fn insert(&mut self, key: impl Into<String>, value: TemplateValue) {
        self.variables.insert(key.into(), value);
    }

    /// Add every entry of a map value to this layer.
    ///
    /// Non-map values carry no bindings and are ignored.
    pub fn extend_from_value(&mut self, value: &TemplateValue) {
        if let TemplateValue::Map(entries) = value {
            for (key, value) in entries {
                self.variables.insert(key.clone(), value.clone());
            }
        }
    }

    /// Get a variable from the context, checking parent layers.
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.variables
            .get(key)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(key)))
    }

    /// Get a variable by path (e.g., `["employee", "salary"]`).
    ///
    /// The first segment picks the innermost layer that binds it; the rest of
    /// the path is walked inside that value only.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let (first, rest) = path.split_first()?;
        self.get(first).and_then(|v| v.get_path(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_scoping() {
        let mut parent = TemplateContext::new();
        parent.insert("x", TemplateValue::from("parent_x"));
        parent.insert("y", TemplateValue::from("parent_y"));
        let parent = Arc::new(parent);

        let mut child = TemplateContext::layered_on(&parent);
        child.insert("x", TemplateValue::from("child_x"));

        // Child shadows parent for 'x'
        assert_eq!(child.get("x"), Some(&TemplateValue::from("child_x")));
        // Child inherits 'y' from parent
        assert_eq!(child.get("y"), Some(&TemplateValue::from("parent_y")));
        // Parent unchanged
        assert_eq!(parent.get("x"), Some(&TemplateValue::from("parent_x")));
    }

    #[test]
    fn test_shadowing_is_shallow() {
        let mut base = TemplateContext::new();
        base.insert(
            "user",
            TemplateValue::map([("name", "Ada"), ("role", "admin")]),
        );
        let base = Arc::new(base);

        let mut overrides = TemplateContext::layered_on(&base);
        overrides.extend_from_value(&TemplateValue::map([(
            "user",
            TemplateValue::map([("name", "Grace")]),
        )]));

        assert_eq!(
            overrides.get_path(&["user", "name"]),
            Some(&TemplateValue::from("Grace"))
        );
        // The override replaced the whole `user` binding.
        assert_eq!(overrides.get_path(&["user", "role"]), None);
        assert_eq!(
            base.get_path(&["user", "role"]),
            Some(&TemplateValue::from("admin"))
        );
    }

    #[test]
    fn test_empty_path_resolves_nothing() {
        let ctx = TemplateContext::new();
        assert_eq!(ctx.get_path(&[]), None);
    }
}
