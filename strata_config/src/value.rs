//! Raw property values and their textual rendering.

use std::collections::BTreeMap;

pub use serde_json::Value;

/// Renders a raw value as the text handed to interpolation and decoding.
///
/// Strings are returned verbatim, scalars use their canonical form, arrays
/// are comma-joined and objects fall back to compact JSON.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata_config::to_raw_string;
///
/// assert_eq!(to_raw_string(&json!("a")), "a");
/// assert_eq!(to_raw_string(&json!(8080)), "8080");
/// assert_eq!(to_raw_string(&json!(["a", 1, true])), "a,1,true");
/// ```
#[must_use]
pub fn to_raw_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(to_raw_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Flattens nested objects into dotted keys, leaving arrays and scalars as
/// leaf values.
pub(crate) fn flatten_into(prefix: &str, value: Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, nested, out);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_owned(), leaf);
            }
        }
    }
}
