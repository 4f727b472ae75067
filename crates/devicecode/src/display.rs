//! Plain-text rendering of the resource response.

use serde_json::{Map, Value};

/// Renders each top-level property as a `name = value` line.
///
/// Strings are printed without quotes and `null` as an empty value; nested
/// objects and arrays are printed as JSON.
pub fn properties(object: &Map<String, Value>) -> Vec<String> {
    object
        .iter()
        .map(|(name, value)| format!("{name} = {}", scalar(value)))
        .collect()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
