// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::models::state::SelectionState;
use crate::models::types::{GraphStructure, NodeGroup, Point, PopupSize, Viewport};
use crate::systems::placement::{compute_placement, Placement, PlacementConfig};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    pub group: NodeGroup,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderEdge {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderData {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl From<&GraphStructure> for RenderData {
    fn from(structure: &GraphStructure) -> Self {
        RenderData {
            nodes: structure
                .nodes
                .iter()
                .map(|n| RenderNode {
                    id: n.id.clone(),
                    label: n.label.clone(),
                    group: n.group,
                })
                .collect(),
            edges: structure
                .edges
                .iter()
                .map(|e| RenderEdge {
                    from: e.from.clone(),
                    to: e.to.clone(),
                })
                .collect(),
        }
    }
}

pub trait RenderSurface {
    /// Canvas coordinates to viewport coordinates under the current pan and zoom.
    fn project(&self, canvas: Point) -> Point;

    /// Canvas position of a node, if the surface knows it.
    fn node_position(&self, node_id: &str) -> Option<Point>;

    fn viewport(&self) -> Viewport;

    /// Drops handlers and any other resources held by the surface.
    fn release(&mut self);
}

pub trait SurfaceFactory {
    type Surface: RenderSurface;

    fn create(&mut self, data: &RenderData) -> Self::Surface;
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    /// `None` when the click hit empty canvas.
    Click { node: Option<String> },
    DragStart { node: Option<String> },
    DragEnd { node: Option<String> },
    Zoom,
    Close,
}

pub struct GraphRenderAdapter<F: SurfaceFactory> {
    factory: F,
    data: Option<RenderData>,
    surface: Option<F::Surface>,
    selection: SelectionState,
    popup: PopupSize,
    placement: PlacementConfig,
}

impl<F: SurfaceFactory> GraphRenderAdapter<F> {
    pub fn new(factory: F, popup: PopupSize, placement: PlacementConfig) -> Self {
        Self {
            factory,
            data: None,
            surface: None,
            selection: SelectionState::new(),
            popup,
            placement,
        }
    }

    /// Returns true when a new surface was instantiated.
    pub fn sync_structure(&mut self, structure: &GraphStructure) -> bool {
        let data = RenderData::from(structure);
        if self.surface.is_some() && self.data.as_ref() == Some(&data) {
            return false;
        }

        self.release();
        self.surface = Some(self.factory.create(&data));
        self.data = Some(data);
        true
    }

    pub fn handle(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Click { node: Some(id) } => match self.placement_for(&id) {
                Some(placement) => self.selection.select(&id, placement),
                None => self.selection.clear(),
            },
            SurfaceEvent::Click { node: None } | SurfaceEvent::Zoom | SurfaceEvent::Close => {
                self.selection.clear()
            }
            SurfaceEvent::DragStart { node } => match node {
                Some(id) if self.selection.is_selected(&id) => self.selection.suspend(),
                _ => self.selection.clear(),
            },
            SurfaceEvent::DragEnd { node: Some(id) } => {
                if self.selection.is_selected(&id) {
                    if let Some(placement) = self.placement_for(&id) {
                        self.selection.reposition(placement);
                    }
                }
            }
            SurfaceEvent::DragEnd { node: None } => {}
        }
    }

    /// Re-anchors the open popup, e.g. after the viewport was resized.
    pub fn refresh_placement(&mut self) {
        let id = match self.selection.selected() {
            Some(id) if self.selection.is_visible() => id.to_string(),
            _ => return,
        };
        match self.placement_for(&id) {
            Some(placement) => self.selection.reposition(placement),
            None => self.selection.clear(),
        }
    }

    pub fn placement_for(&self, node_id: &str) -> Option<Placement> {
        let surface = self.surface.as_ref()?;
        let position = surface.node_position(node_id)?;
        Some(compute_placement(
            position,
            |p| surface.project(p),
            surface.viewport(),
            self.popup,
            &self.placement,
        ))
    }

    pub fn set_popup_size(&mut self, popup: PopupSize) {
        self.popup = popup;
    }

    pub fn popup_size(&self) -> PopupSize {
        self.popup
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn data(&self) -> Option<&RenderData> {
        self.data.as_ref()
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut F::Surface> {
        self.surface.as_mut()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn release(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }
        self.data = None;
        self.selection.clear();
    }
}

impl<F: SurfaceFactory> Drop for GraphRenderAdapter<F> {
    fn drop(&mut self) {
        self.release();
    }
}
