/*
 * logical.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Logical and comparison helpers.

use crate::value::TemplateValue;
use std::cmp::Ordering;

/// `and`, `or`, `not`, `eq`, `ne`, `gt`, `gte`, `lt`, `lte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl LogicalOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "and" => LogicalOp::And,
            "or" => LogicalOp::Or,
            "not" => LogicalOp::Not,
            "eq" => LogicalOp::Eq,
            "ne" => LogicalOp::Ne,
            "gt" => LogicalOp::Gt,
            "gte" => LogicalOp::Gte,
            "lt" => LogicalOp::Lt,
            "lte" => LogicalOp::Lte,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Not => "not",
            LogicalOp::Eq => "eq",
            LogicalOp::Ne => "ne",
            LogicalOp::Gt => "gt",
            LogicalOp::Gte => "gte",
            LogicalOp::Lt => "lt",
            LogicalOp::Lte => "lte",
        }
    }

    /// Apply the operator. `None` means an operand is missing.
    pub fn evaluate(self, args: &[TemplateValue]) -> Option<bool> {
        match self {
            LogicalOp::And if args.is_empty() => None,
            LogicalOp::And => Some(args.iter().all(TemplateValue::is_truthy)),
            LogicalOp::Or if args.is_empty() => None,
            LogicalOp::Or => Some(args.iter().any(TemplateValue::is_truthy)),
            LogicalOp::Not => args.first().map(|v| !v.is_truthy()),
            LogicalOp::Eq => binary(args, loose_eq),
            LogicalOp::Ne => binary(args, |a, b| !loose_eq(a, b)),
            LogicalOp::Gt => binary(args, |a, b| compare(a, b) == Some(Ordering::Greater)),
            LogicalOp::Gte => binary(args, |a, b| {
                matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal))
            }),
            LogicalOp::Lt => binary(args, |a, b| compare(a, b) == Some(Ordering::Less)),
            LogicalOp::Lte => binary(args, |a, b| {
                matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))
            }),
        }
    }
}

fn binary(
    args: &[TemplateValue],
    f: impl Fn(&TemplateValue, &TemplateValue) -> bool,
) -> Option<bool> {
    match args {
        [a, b, ..] => Some(f(a, b)),
        _ => None,
    }
}

/// Equality with numeric coercion between numbers and numeric strings.
///
/// Booleans only equal booleans and `null` only equals `null`.
pub fn loose_eq(a: &TemplateValue, b: &TemplateValue) -> bool {
    use TemplateValue::*;
    match (a, b) {
        (Number(x), Number(y)) => x == y,
        (Number(n), String(_)) => b.as_number() == Some(*n),
        (String(_), Number(n)) => a.as_number() == Some(*n),
        (String(x), String(y)) => match (a.as_number(), b.as_number()) {
            (Some(nx), Some(ny)) => nx == ny,
            _ => x == y,
        },
        (Bool(x), Bool(y)) => x == y,
        (Null, Null) => true,
        (List(x), List(y)) => x == y,
        (Map(x), Map(y)) => x == y,
        _ => false,
    }
}

/// Ordering: numeric when both sides coerce, lexicographic between strings.
pub fn compare(a: &TemplateValue, b: &TemplateValue) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (TemplateValue::String(x), TemplateValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
