// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

//! Normalization of engine-supplied conditional probability tables.

use crate::error::CptError;
use crate::systems::key_format::label_of;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// State label -> probability, in engine order.
pub type StateDistribution = IndexMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscreteCpt {
    pub possible_values: Vec<String>,
    /// Parent-configuration key -> distribution over the node's states.
    pub table: IndexMap<String, StateDistribution>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinaryEntry {
    /// Parent labels, in configuration order.
    pub parents: Vec<String>,
    pub probability_true: f64,
    pub probability_false: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinaryCpt {
    pub table: Vec<BinaryEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedCpt {
    /// Empty or absent table: the node has no parents.
    Root { possible_values: Vec<String> },
    Discrete(DiscreteCpt),
    Binary(BinaryCpt),
}

pub fn normalize(raw: &Value) -> Result<NormalizedCpt, CptError> {
    let tagged = raw
        .as_object()
        .ok_or_else(|| CptError::UnrecognizedFormat(format!("expected a tagged object, got {}", kind_of(raw))))?;

    if let Some(discrete) = tagged.get("Discrete") {
        normalize_discrete(discrete)
    } else if let Some(binary) = tagged.get("Binary") {
        normalize_binary(binary)
    } else {
        let tags: Vec<&str> = tagged.keys().map(String::as_str).collect();
        Err(CptError::UnrecognizedFormat(format!(
            "no Discrete or Binary tag (found [{}])",
            tags.join(", ")
        )))
    }
}

impl NormalizedCpt {
    /// Re-encodes in the engine's flattened form; `normalize` accepts it back unchanged.
    pub fn to_value(&self) -> Value {
        match self {
            NormalizedCpt::Root { possible_values } => json!({
                "Discrete": { "node_possible_values": possible_values, "table": {} }
            }),
            NormalizedCpt::Discrete(cpt) => {
                let table: Map<String, Value> = cpt
                    .table
                    .iter()
                    .map(|(key, dist)| {
                        let states: Map<String, Value> =
                            dist.iter().map(|(s, p)| (s.clone(), json!(p))).collect();
                        (key.clone(), Value::Object(states))
                    })
                    .collect();
                json!({
                    "Discrete": { "node_possible_values": cpt.possible_values, "table": table }
                })
            }
            NormalizedCpt::Binary(cpt) => {
                let table: Vec<Value> = cpt
                    .table
                    .iter()
                    .map(|e| json!([e.parents, e.probability_true]))
                    .collect();
                json!({ "Binary": { "table": table } })
            }
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, NormalizedCpt::Root { .. })
    }
}

fn normalize_discrete(body: &Value) -> Result<NormalizedCpt, CptError> {
    let body = body
        .as_object()
        .ok_or_else(|| CptError::UnrecognizedFormat(format!("Discrete body is {}", kind_of(body))))?;

    let possible_values = match body.get("node_possible_values").or_else(|| body.get("possible_values")) {
        Some(Value::Array(values)) => values.iter().map(label_of).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(CptError::UnrecognizedFormat(format!(
                "possible values are {}",
                kind_of(other)
            )))
        }
    };

    let mut table = IndexMap::new();
    match body.get("table") {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (key, dist) in entries {
                table.insert(key.clone(), normalize_distribution(dist)?);
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                let (key, dist) = as_pair(entry)?;
                table.insert(configuration_key(key), normalize_distribution(dist)?);
            }
        }
        Some(other) => {
            return Err(CptError::UnrecognizedFormat(format!("Discrete table is {}", kind_of(other))))
        }
    }

    if table.is_empty() {
        Ok(NormalizedCpt::Root { possible_values })
    } else {
        Ok(NormalizedCpt::Discrete(DiscreteCpt { possible_values, table }))
    }
}

fn normalize_binary(body: &Value) -> Result<NormalizedCpt, CptError> {
    let table = match body.get("table") {
        None | Some(Value::Null) => return Ok(NormalizedCpt::Root { possible_values: Vec::new() }),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(CptError::UnrecognizedFormat(format!("Binary table is {}", kind_of(other))))
        }
    };

    if table.is_empty() {
        return Ok(NormalizedCpt::Root { possible_values: Vec::new() });
    }

    let mut entries = Vec::with_capacity(table.len());
    for entry in table {
        let (parents, probability) = as_pair(entry)?;
        let parents = match parents {
            Value::Array(values) => values.iter().map(label_of).collect(),
            Value::Null => Vec::new(),
            other => vec![label_of(other)],
        };
        let probability_true = probability_of(probability)?;
        entries.push(BinaryEntry {
            parents,
            probability_true,
            probability_false: 1.0 - probability_true,
        });
    }

    Ok(NormalizedCpt::Binary(BinaryCpt { table: entries }))
}

fn normalize_distribution(dist: &Value) -> Result<StateDistribution, CptError> {
    let mut out = StateDistribution::new();
    match dist {
        Value::Object(states) => {
            for (state, p) in states {
                out.insert(state_label(state), probability_of(p)?);
            }
        }
        Value::Array(pairs) => {
            for pair in pairs {
                let (state, p) = as_pair(pair)?;
                out.insert(label_of(state), probability_of(p)?);
            }
        }
        other => {
            return Err(CptError::UnrecognizedFormat(format!("distribution is {}", kind_of(other))))
        }
    }
    Ok(out)
}

/// A flattened string key may itself be an encoded labeled value.
fn state_label(key: &str) -> String {
    match serde_json::from_str::<Value>(key) {
        Ok(value @ Value::Object(_)) | Ok(value @ Value::String(_)) => label_of(&value),
        _ => key.to_string(),
    }
}

fn configuration_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Null => "[]".to_string(),
        other => other.to_string(),
    }
}

fn as_pair(entry: &Value) -> Result<(&Value, &Value), CptError> {
    match entry.as_array().map(Vec::as_slice) {
        Some([first, second]) => Ok((first, second)),
        _ => Err(CptError::UnrecognizedFormat(format!(
            "expected a [key, value] pair, got {}",
            entry
        ))),
    }
}

fn probability_of(value: &Value) -> Result<f64, CptError> {
    value
        .as_f64()
        .ok_or_else(|| CptError::UnrecognizedFormat(format!("probability {} is not a number", value)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_discrete() -> Value {
        json!({
            "Discrete": {
                "node_possible_values": [{"Value": "Bajo"}, {"Value": "Normal"}, {"Value": "Alto"}],
                "table": [
                    [[{"Value": "Normal"}], [[{"Value": "Normal"}, 0.9], [{"Value": "Bajo"}, 0.05], [{"Value": "Alto"}, 0.05]]],
                    [[{"Value": "Fuga"}], [[{"Value": "Alto"}, 0.7], [{"Value": "Normal"}, 0.2], [{"Value": "Bajo"}, 0.1]]]
                ]
            }
        })
    }

    #[test]
    fn nested_discrete_is_flattened_to_labels() {
        let cpt = normalize(&nested_discrete()).unwrap();
        let NormalizedCpt::Discrete(cpt) = cpt else {
            panic!("expected a discrete table");
        };

        assert_eq!(cpt.possible_values, vec!["Bajo", "Normal", "Alto"]);
        let keys: Vec<&String> = cpt.table.keys().collect();
        assert_eq!(keys, vec![r#"[{"Value":"Normal"}]"#, r#"[{"Value":"Fuga"}]"#]);
        assert_eq!(cpt.table[r#"[{"Value":"Fuga"}]"#]["Alto"], 0.7);
        let states: Vec<&String> = cpt.table[0].keys().collect();
        assert_eq!(states, vec!["Normal", "Bajo", "Alto"]);
    }

    #[test]
    fn flattened_discrete_is_accepted() {
        let raw = json!({
            "Discrete": {
                "node_possible_values": ["Bueno", "Degradado"],
                "table": {
                    "[{\"Value\":\"Bueno\"}]": { "{\"Value\":\"Normal\"}": 0.9, "Baja": 0.05, "Alta": 0.05 }
                }
            }
        });
        let NormalizedCpt::Discrete(cpt) = normalize(&raw).unwrap() else {
            panic!("expected a discrete table");
        };
        let dist = &cpt.table[r#"[{"Value":"Bueno"}]"#];
        assert_eq!(dist["Normal"], 0.9);
        assert_eq!(dist["Baja"], 0.05);
    }

    #[test]
    fn discrete_normalization_is_idempotent() {
        let once = normalize(&nested_discrete()).unwrap();
        let twice = normalize(&once.to_value()).unwrap();
        assert_eq!(once, twice);

        let root = normalize(&json!({"Discrete": {"node_possible_values": [], "table": []}})).unwrap();
        assert_eq!(normalize(&root.to_value()).unwrap(), root);
    }

    #[test]
    fn binary_false_is_complement_of_true() {
        let raw = json!({
            "Binary": {
                "table": [
                    [[{"Value": "Alto"}, {"Value": "Acido"}], 0.0],
                    [[{"Value": "Alto"}, {"Value": "Neutro"}], 1.0],
                    [[{"Value": "Bajo"}, {"Value": "Neutro"}], 0.35]
                ]
            }
        });
        let NormalizedCpt::Binary(cpt) = normalize(&raw).unwrap() else {
            panic!("expected a binary table");
        };

        assert_eq!(cpt.table.len(), 3);
        for entry in &cpt.table {
            assert_eq!(entry.probability_false, 1.0 - entry.probability_true);
        }
        assert_eq!(cpt.table[0].probability_false, 1.0);
        assert_eq!(cpt.table[1].probability_false, 0.0);
        assert_eq!(cpt.table[0].parents, vec!["Alto", "Acido"]);
    }

    #[test]
    fn binary_round_trips_through_its_own_encoding() {
        let raw = json!({"Binary": {"table": [[[{"Value": "Bajo"}], 0.25]]}});
        let once = normalize(&raw).unwrap();
        assert_eq!(normalize(&once.to_value()).unwrap(), once);
    }

    #[test]
    fn empty_or_absent_tables_are_roots() {
        assert!(normalize(&json!({"Binary": {"table": []}})).unwrap().is_root());
        assert!(normalize(&json!({"Binary": {}})).unwrap().is_root());
        assert!(normalize(&json!({"Discrete": {"node_possible_values": [{"Value": "Bueno"}]}}))
            .unwrap()
            .is_root());
        assert_eq!(
            normalize(&json!({"Discrete": {"node_possible_values": [{"Value": "Bueno"}], "table": {}}})).unwrap(),
            NormalizedCpt::Root { possible_values: vec!["Bueno".into()] }
        );
    }

    #[test]
    fn unknown_tags_are_reported_not_thrown() {
        let err = normalize(&json!({"Gaussian": {"mean": 0.0}})).unwrap_err();
        assert!(matches!(err, CptError::UnrecognizedFormat(ref msg) if msg.contains("Gaussian")));

        assert!(normalize(&json!("Discrete")).is_err());
        assert!(normalize(&json!({"Discrete": {"table": 3}})).is_err());
        assert!(normalize(&json!({"Binary": {"table": [[[], "high"]]}})).is_err());
    }
}
