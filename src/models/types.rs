// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::constants::{POPUP_HEIGHT, POPUP_WIDTH};

/// Sensor id -> selected option label. Every configured sensor always has a value.
pub type EvidenceAssignment = BTreeMap<String, String>;

/// State label -> posterior probability.
pub type Distribution = BTreeMap<String, f64>;

/// Target id -> posterior distribution. Replaced wholesale on every pass.
pub type InferenceResult = BTreeMap<String, Distribution>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeGroup {
    #[serde(rename = "Oculto", alias = "Hidden")]
    Hidden,
    #[serde(rename = "Físico", alias = "Physical", alias = "Fisico")]
    Physical,
    #[serde(rename = "Sensor")]
    Sensor,
}

impl NodeGroup {
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeGroup::Hidden => "Nodos Ocultos",
            NodeGroup::Physical => "Estados Físicos Reales",
            NodeGroup::Sensor => "Sensores (Evidencia)",
        }
    }
}

impl fmt::Display for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeGroup::Hidden => "Oculto",
            NodeGroup::Physical => "Físico",
            NodeGroup::Sensor => "Sensor",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub group: NodeGroup,
    // Anything else the engine attaches (levels, internal ids, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: &str, label: &str, group: NodeGroup) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            group,
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStructure {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Visible drawing area, origin at its top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopupSize {
    pub width: f64,
    pub height: f64,
}

impl PopupSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Character-cell popup used by the terminal dashboard.
    pub fn terminal() -> Self {
        Self::new(POPUP_WIDTH, POPUP_HEIGHT)
    }

    #[cfg(test)]
    pub(crate) fn pixels() -> Self {
        use crate::models::constants::{PIXEL_POPUP_HEIGHT, PIXEL_POPUP_WIDTH};
        Self::new(PIXEL_POPUP_WIDTH, PIXEL_POPUP_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_keeps_engine_fields_aside() {
        let node: Node = serde_json::from_value(json!({
            "id": "T_sensor",
            "label": "T_sensor",
            "group": "Sensor",
            "level": 3
        }))
        .unwrap();

        assert_eq!(node.group, NodeGroup::Sensor);
        assert_eq!(node.extra.get("level"), Some(&json!(3)));
    }

    #[test]
    fn group_accepts_both_spellings() {
        let hidden: NodeGroup = serde_json::from_value(json!("Hidden")).unwrap();
        let physical: NodeGroup = serde_json::from_value(json!("Físico")).unwrap();
        assert_eq!(hidden, NodeGroup::Hidden);
        assert_eq!(physical, NodeGroup::Physical);
        assert_eq!(serde_json::to_value(NodeGroup::Hidden).unwrap(), json!("Oculto"));
    }
}
