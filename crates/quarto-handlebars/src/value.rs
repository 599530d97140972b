/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template values.
//!
//! [`TemplateValue`] is the data model every lookup, helper argument and
//! helper result goes through. It converts losslessly from `serde_json::Value`
//! so caller-supplied JSON behaves exactly like system-built context.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Ordered string-keyed map of values.
pub type ValueMap = IndexMap<String, TemplateValue>;

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateValue {
    /// A null/missing value.
    #[default]
    Null,

    /// A boolean value.
    Bool(bool),

    /// A numeric value.
    Number(f64),

    /// A string value.
    String(String),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// A map of string keys to values.
    Map(ValueMap),
}

impl TemplateValue {
    /// Build a map value from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<TemplateValue>,
    {
        TemplateValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Falsy: `null`, `false`, `0`, `NaN`, `""`, empty lists and empty maps.
    /// The string `"false"` is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Null => false,
            TemplateValue::Bool(b) => *b,
            TemplateValue::Number(n) => *n != 0.0 && !n.is_nan(),
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::List(items) => !items.is_empty(),
            TemplateValue::Map(m) => !m.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TemplateValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of this value.
    ///
    /// Numbers are themselves; strings coerce when their trimmed content is a
    /// finite number. Booleans, null and containers never coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TemplateValue::Number(n) => Some(*n),
            TemplateValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Get a nested field by path.
    ///
    /// Map segments are looked up by key, list segments by numeric index.
    /// Anything else short-circuits to `None`.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };

        match self {
            TemplateValue::Map(m) => m.get(*first).and_then(|v| v.get_path(rest)),
            TemplateValue::List(items) => first
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .and_then(|v| v.get_path(rest)),
            _ => None,
        }
    }

    /// Render this value as a string for output.
    ///
    /// - String: returned as-is
    /// - Number: integral values without a fraction (`5`), others in shortest form
    /// - Bool: "true" or "false"
    /// - List: rendered elements joined with `,`
    /// - Map: compact JSON
    /// - Null: ""
    pub fn render(&self) -> String {
        match self {
            TemplateValue::Null => String::new(),
            TemplateValue::Bool(b) => b.to_string(),
            TemplateValue::Number(n) => format_number(*n),
            TemplateValue::String(s) => s.clone(),
            TemplateValue::List(items) => items
                .iter()
                .map(TemplateValue::render)
                .collect::<Vec<_>>()
                .join(","),
            TemplateValue::Map(_) => self.to_json().to_string(),
        }
    }

    /// Convert to a JSON value. Integral numbers become JSON integers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TemplateValue::Null => serde_json::Value::Null,
            TemplateValue::Bool(b) => serde_json::Value::Bool(*b),
            TemplateValue::Number(n) => {
                if is_integral(*n) {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            TemplateValue::String(s) => serde_json::Value::String(s.clone()),
            TemplateValue::List(items) => {
                serde_json::Value::Array(items.iter().map(TemplateValue::to_json).collect())
            }
            TemplateValue::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15
}

fn format_number(n: f64) -> String {
    if is_integral(n) {
        (n as i64).to_string()
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl Serialize for TemplateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(TemplateValue::Null, TemplateValue::Number),
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(m) => TemplateValue::Map(
                m.into_iter().map(|(k, v)| (k, TemplateValue::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl From<f64> for TemplateValue {
    fn from(n: f64) -> Self {
        TemplateValue::Number(n)
    }
}

impl From<i64> for TemplateValue {
    fn from(n: i64) -> Self {
        TemplateValue::Number(n as f64)
    }
}

impl From<usize> for TemplateValue {
    fn from(n: usize) -> Self {
        TemplateValue::Number(n as f64)
    }
}

impl From<Vec<TemplateValue>> for TemplateValue {
    fn from(items: Vec<TemplateValue>) -> Self {
        TemplateValue::List(items)
    }
}

impl From<ValueMap> for TemplateValue {
    fn from(m: ValueMap) -> Self {
        TemplateValue::Map(m)
    }
}
