// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

//! Human-readable rendering of parent-configuration keys.

use crate::models::constants::{CONJUNCTION, ROOT_LABEL};
use serde_json::Value;

pub fn format_key(key: Option<&str>) -> String {
    let raw = match key.map(str::trim) {
        None | Some("") => return ROOT_LABEL.to_string(),
        Some(raw) => raw,
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => format_parsed(&parsed),
        Err(_) => clean_raw(raw),
    }
}

/// Joins an already decoded configuration, keeping the supplied order.
pub fn format_configuration(values: &[Value]) -> String {
    if values.is_empty() {
        return ROOT_LABEL.to_string();
    }
    values
        .iter()
        .map(label_of)
        .collect::<Vec<_>>()
        .join(CONJUNCTION)
}

/// Reduces a labeled value (`{"Value": "Bajo"}`, `"True"`, ...) to its label.
pub fn label_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("Value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => value.to_string(),
            Some(other) => other.to_string(),
        },
        other => other.to_string(),
    }
}

fn format_parsed(parsed: &Value) -> String {
    match parsed {
        Value::Null => ROOT_LABEL.to_string(),
        Value::Array(items) => format_configuration(items),
        other => label_of(other),
    }
}

fn clean_raw(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '[' | ']' | '"')).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        ROOT_LABEL.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_absent_keys_are_root() {
        assert_eq!(format_key(Some("[]")), ROOT_LABEL);
        assert_eq!(format_key(None), ROOT_LABEL);
        assert_eq!(format_key(Some("")), ROOT_LABEL);
        assert_eq!(format_key(Some("null")), ROOT_LABEL);
    }

    #[test]
    fn single_value_is_its_label() {
        assert_eq!(format_key(Some(r#"[{"Value":"Alto"}]"#)), "Alto");
    }

    #[test]
    fn conjunction_keeps_source_order() {
        assert_eq!(
            format_key(Some(r#"[{"Value":"Alto"},{"Value":"Acido"}]"#)),
            "Alto ∧ Acido"
        );
        assert_eq!(
            format_key(Some(r#"[{"Value":"Degradado"},{"Value":"Bajo"}]"#)),
            "Degradado ∧ Bajo"
        );
    }

    #[test]
    fn unit_states_and_bare_objects() {
        assert_eq!(format_key(Some(r#"["True",{"Value":"Bajo"}]"#)), "True ∧ Bajo");
        assert_eq!(format_key(Some(r#"{"Value":"Neutro"}"#)), "Neutro");
        assert_eq!(format_key(Some(r#""Normal""#)), "Normal");
    }

    #[test]
    fn malformed_keys_fall_back_to_cleaned_text() {
        assert_eq!(format_key(Some(r#"[{"Value":"Alto"}"#)), "{Value:Alto}");
        assert_eq!(format_key(Some("Normal")), "Normal");
        assert_eq!(format_key(Some(r#"["Alto", "Bajo""#)), "Alto, Bajo");
    }

    #[test]
    fn unknown_objects_render_as_json() {
        assert_eq!(label_of(&json!({"Other": 1})), r#"{"Other":1}"#);
        assert_eq!(label_of(&json!({"Value": 3})), "3");
    }
}
