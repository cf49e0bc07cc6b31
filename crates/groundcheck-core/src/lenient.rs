//! Forgiving serde adapters for LLM-produced JSON.
//!
//! Judges routinely return `"4"` instead of `4`, `"true"` instead of `true`,
//! a bare string where a list was requested, or `null` for anything. These
//! helpers are used with `#[serde(default, deserialize_with = "...")]` so a
//! sloppy field never sinks the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Renders a JSON scalar as plain text (`12.0` becomes `"12"`).
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

pub(crate) fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "si" | "sí"
        ),
        _ => false,
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(value_as_bool(&Value::deserialize(d)?))
}

pub fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(value_as_f64(&Value::deserialize(d)?)
        .filter(|f| f.is_finite())
        .unwrap_or(0.0))
}

pub fn u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = value_as_f64(&Value::deserialize(d)?).unwrap_or(0.0);
    Ok(if value.is_finite() && value > 0.0 { value.round() as u32 } else { 0 })
}

pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_text(&Value::deserialize(d)?))
}

/// Accepts a list of scalars, a single string, or null.
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items.iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_text(&other)],
    };
    Ok(items.into_iter().filter(|s| !s.is_empty()).collect())
}
