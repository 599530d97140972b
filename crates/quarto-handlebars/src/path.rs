/*
 * path.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dotted-path resolution.
//!
//! `user.profile.name` is split on `.` and walked segment by segment. A
//! missing segment, or `null` part way along, resolves to `None`; resolution
//! never fails and never mutates the context.

use crate::context::TemplateContext;
use crate::value::{TemplateValue, ValueMap};

/// Split a dotted path into segments.
///
/// Returns `None` for an empty path or one with empty segments (`a..b`, `.a`).
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Resolve a dotted path against a context.
pub fn resolve<'a>(context: &'a TemplateContext, path: &str) -> Option<&'a TemplateValue> {
    let segments = split_path(path)?;
    context.get_path(&segments)
}

/// Resolve a dotted path inside a plain map.
pub fn resolve_in_map<'a>(map: &'a ValueMap, path: &str) -> Option<&'a TemplateValue> {
    let segments = split_path(path)?;
    let (first, rest) = segments.split_first()?;
    map.get(*first).and_then(|v| v.get_path(rest))
}
