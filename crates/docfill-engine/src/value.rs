/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The dynamic value tree templates are evaluated against.
//!
//! Values come from parsed JSON and are never mutated by the engine; pipe
//! operators that reorder or slice produce fresh values instead. Objects
//! preserve insertion order so property enumeration stays deterministic.

use hashlink::LinkedHashMap;

/// A node in the data tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or JSON null.
    Null,

    /// A boolean.
    Bool(bool),

    /// An integer number.
    Int(i64),

    /// A floating-point number.
    Float(f64),

    /// A string.
    String(String),

    /// An ordered sequence of values.
    Array(Vec<Value>),

    /// An ordered string-keyed mapping. Lookup is case-sensitive.
    Object(LinkedHashMap<String, Value>),
}

impl Value {
    /// Build a value tree from parsed JSON.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut out = LinkedHashMap::new();
                for (key, value) in map {
                    out.insert(key, Value::from_json(value));
                }
                Value::Object(out)
            }
        }
    }

    /// Convert back to JSON (used for the compact rendering of composites).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }

    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness for conditionals, loops and the `if` operator.
    ///
    /// Strings are truthy when non-empty after trimming; numbers when their
    /// magnitude exceeds epsilon; arrays and objects when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => f.abs() > f64::EPSILON,
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Render this value as output text.
    ///
    /// Null renders empty, booleans as `True`/`False`, numbers in invariant
    /// decimal form without spurious trailing zeros, and composites as
    /// compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => render_f64(*f),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_default()
            }
        }
    }

    /// Element count for the `count` operator.
    ///
    /// Strings count UTF-16 code units, matching how a word processor
    /// reports text length.
    pub fn count(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Array(items) => items.len() as i64,
            Value::Object(map) => map.len() as i64,
            Value::String(s) => s.encode_utf16().count() as i64,
            _ => 1,
        }
    }

    /// The numeric magnitude of this value, if it is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Format a float without trailing zeros beyond its precision.
fn render_f64(f: f64) -> String {
    if f.is_finite() && f == f.trunc() && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}
