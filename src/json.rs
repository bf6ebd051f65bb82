// src/json.rs

use serde_json::Value;

/// Walk `keys` through nested objects; `None` on the first miss.
pub fn nested<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |cur, k| cur.get(*k))
}

pub fn nested_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    nested(value, keys).and_then(Value::as_str)
}

pub fn nested_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    nested(value, keys).and_then(Value::as_i64)
}

pub fn nested_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    nested(value, keys).and_then(Value::as_u64)
}

/// Non-null nested value, cloned; `Value::Null` otherwise.
pub fn nested_or_null(value: &Value, keys: &[&str]) -> Value {
    nested(value, keys).cloned().unwrap_or(Value::Null)
}

/// Render a scalar for a CSV cell. Null becomes empty.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
