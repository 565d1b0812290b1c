// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::systems::placement::Placement;
use serde::Serialize;

/// Which node's popup is open and where it is anchored.
///
/// Created empty, set on click, suspended while the selected node is being
/// dragged, cleared on pan, zoom, foreign drag or explicit close.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectionState {
    node: Option<String>,
    placement: Option<Placement>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, node_id: &str, placement: Placement) {
        self.node = Some(node_id.to_string());
        self.placement = Some(placement);
    }

    pub fn reposition(&mut self, placement: Placement) {
        if self.node.is_some() {
            self.placement = Some(placement);
        }
    }

    /// Hides the popup but remembers the node.
    pub fn suspend(&mut self) {
        self.placement = None;
    }

    pub fn clear(&mut self) {
        self.node = None;
        self.placement = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn is_selected(&self, node_id: &str) -> bool {
        self.node.as_deref() == Some(node_id)
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// True when a popup should actually be drawn.
    pub fn is_visible(&self) -> bool {
        self.node.is_some() && self.placement.is_some()
    }
}
