//! Query-string values turned into where-clause operands

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{Criteria, FieldType, Model};

/// Whether a string reads as a number the loose way query strings are read
///
/// Blank strings count as numeric.
fn looks_numeric(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).is_ok();
    }
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" {
        return true;
    }
    trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Interpret a query value for a field of the given type
///
/// Text fields keep numeric-looking strings as strings. Everything else is
/// parsed as JSON when possible (numbers, booleans, `null`, arrays, objects)
/// and kept as the raw string otherwise.
pub fn safeish_parse(raw: &str, field_type: Option<FieldType>) -> Value {
    if field_type.is_some_and(|t| t.is_text()) && looks_numeric(raw) {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Interpret a path parameter for a field of the given type
///
/// Only numbers and booleans are converted, and only for fields of that type.
pub fn coerce_path_value(raw: &str, field_type: Option<FieldType>) -> Value {
    match field_type {
        Some(FieldType::Integer | FieldType::BigInt) => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some(FieldType::Float) => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(FieldType::Boolean) => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

/// Add an equality filter for every query parameter named after a model field
///
/// Later values replace earlier criteria on the same field.
pub fn apply_implicit_filters(
    model: &dyn Model,
    query: &BTreeMap<String, String>,
    criteria: &mut Criteria,
) {
    for (key, raw) in query {
        if let Some(field) = model.field(key) {
            criteria.set(key.clone(), safeish_parse(raw, Some(field.field_type)));
        }
    }
}
