// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::models::constants::{LEVEL_SEPARATION, MAX_ZOOM, MIN_ZOOM, ROW_SEPARATION};
use crate::models::types::{Point, Viewport};
use crate::systems::render_adapter::{RenderData, RenderEdge, RenderNode, RenderSurface, SurfaceFactory};
use ratatui::layout::Rect;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub pan: Point,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            pan: Point::new(0.0, 0.0),
            zoom: 1.0,
        }
    }
}

pub struct TerminalSurface {
    data: RenderData,
    positions: HashMap<String, Point>,
    camera: Camera,
    area: Rect,
    needs_fit: bool,
    released: bool,
}

impl TerminalSurface {
    pub fn new(data: &RenderData, area: Rect) -> Self {
        let mut surface = Self {
            positions: layout(data),
            data: data.clone(),
            camera: Camera::default(),
            area,
            needs_fit: true,
            released: false,
        };
        surface.fit();
        surface
    }

    pub fn nodes(&self) -> &[RenderNode] {
        &self.data.nodes
    }

    pub fn edges(&self) -> &[RenderEdge] {
        &self.data.edges
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Returns true when the panel size actually changed.
    pub fn set_area(&mut self, area: Rect) -> bool {
        if area == self.area {
            return false;
        }
        self.area = area;
        if self.needs_fit {
            self.fit();
        }
        true
    }

    /// Zooms and pans so every node is visible.
    pub fn fit(&mut self) {
        let viewport = self.viewport();
        if self.positions.is_empty() || viewport.width < 1.0 || viewport.height < 1.0 {
            return;
        }

        let (min, max) = self.bounds();
        let label_room = self.data.nodes.iter().map(|n| n.label.chars().count()).max().unwrap_or(0) as f64 + 2.0;
        let usable_width = (viewport.width - label_room).max(1.0);
        let usable_height = (viewport.height - 2.0).max(1.0);

        let span_x = max.x - min.x;
        let span_y = max.y - min.y;
        let zoom_x = if span_x > 0.0 { usable_width / span_x } else { MAX_ZOOM };
        let zoom_y = if span_y > 0.0 { usable_height / span_y } else { MAX_ZOOM };
        let zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM);

        let centre = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        self.camera = Camera {
            zoom,
            pan: Point::new(viewport.width / 2.0 - centre.x * zoom, viewport.height / 2.0 - centre.y * zoom),
        };
        self.needs_fit = false;
    }

    /// Zooms around a panel-relative point, keeping it fixed on screen.
    pub fn zoom_by(&mut self, factor: f64, about: Point) {
        let before = self.unproject(about);
        self.camera.zoom = (self.camera.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.project(before);
        self.camera.pan.x += about.x - after.x;
        self.camera.pan.y += about.y - after.y;
        self.needs_fit = false;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.camera.pan.x += dx;
        self.camera.pan.y += dy;
        self.needs_fit = false;
    }

    /// Moves a node by a panel-space delta.
    pub fn move_node(&mut self, node_id: &str, dx: f64, dy: f64) {
        let zoom = self.camera.zoom;
        if let Some(p) = self.positions.get_mut(node_id) {
            p.x += dx / zoom;
            p.y += dy / zoom;
        }
    }

    pub fn unproject(&self, viewport: Point) -> Point {
        Point::new(
            (viewport.x - self.camera.pan.x) / self.camera.zoom,
            (viewport.y - self.camera.pan.y) / self.camera.zoom,
        )
    }

    /// Converts screen coordinates to panel-relative ones, if inside the panel.
    pub fn to_local(&self, column: u16, row: u16) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.x + self.area.width
            && row >= self.area.y
            && row < self.area.y + self.area.height;
        inside.then(|| Point::new((column - self.area.x) as f64, (row - self.area.y) as f64))
    }

    /// Panel cell where a node's label starts, plus the label's width.
    pub fn label_cell(&self, node: &RenderNode) -> Option<(i32, i32, usize)> {
        let at = self.project(*self.positions.get(&node.id)?);
        let width = node.label.chars().count() + 2;
        let column = at.x.round() as i32 - (width / 2) as i32;
        Some((column, at.y.round() as i32, width))
    }

    /// The node whose label covers a panel-relative cell.
    pub fn node_at(&self, local: Point) -> Option<String> {
        let (column, row) = (local.x.floor() as i32, local.y.floor() as i32);
        self.data
            .nodes
            .iter()
            .rev()
            .find(|node| match self.label_cell(node) {
                Some((start, y, width)) => y == row && column >= start && column < start + width as i32,
                None => false,
            })
            .map(|node| node.id.clone())
    }

    /// Node ids in display order, for keyboard cycling.
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<&RenderNode> = self.data.nodes.iter().collect();
        ids.sort_by(|a, b| {
            let pa = self.positions.get(&a.id).copied().unwrap_or(Point::new(0.0, 0.0));
            let pb = self.positions.get(&b.id).copied().unwrap_or(Point::new(0.0, 0.0));
            pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
        });
        ids.into_iter().map(|n| n.id.clone()).collect()
    }

    fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in self.positions.values() {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }
}

impl RenderSurface for TerminalSurface {
    fn project(&self, canvas: Point) -> Point {
        Point::new(
            canvas.x * self.camera.zoom + self.camera.pan.x,
            canvas.y * self.camera.zoom + self.camera.pan.y,
        )
    }

    fn node_position(&self, node_id: &str) -> Option<Point> {
        self.positions.get(node_id).copied()
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.area.width as f64, self.area.height as f64)
    }

    fn release(&mut self) {
        self.positions.clear();
        self.released = true;
    }
}

#[derive(Default)]
pub struct TerminalSurfaceFactory {
    area: Rect,
    instantiated: usize,
}

impl TerminalSurfaceFactory {
    pub fn new(area: Rect) -> Self {
        Self { area, instantiated: 0 }
    }

    pub fn instantiated(&self) -> usize {
        self.instantiated
    }
}

impl SurfaceFactory for TerminalSurfaceFactory {
    type Surface = TerminalSurface;

    fn create(&mut self, data: &RenderData) -> TerminalSurface {
        self.instantiated += 1;
        TerminalSurface::new(data, self.area)
    }
}

/// Longest-path ranks by Kahn's algorithm; nodes stuck in a cycle go one
/// rank past the deepest node.
fn assign_ranks(data: &RenderData) -> Vec<usize> {
    let index: HashMap<&str, usize> = data.nodes.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();
    let n = data.nodes.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for edge in &data.edges {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            children[from].push(to);
            in_degree[to] += 1;
        }
    }

    let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut ranks = vec![0usize; n];
    let mut visited = vec![false; n];
    let mut head = 0;
    while head < queue.len() {
        let u = queue[head];
        head += 1;
        visited[u] = true;
        for &v in &children[u] {
            ranks[v] = ranks[v].max(ranks[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push(v);
            }
        }
    }

    let deepest = ranks.iter().copied().max().unwrap_or(0);
    for (v, rank) in ranks.iter_mut().enumerate() {
        if !visited[v] {
            *rank = deepest + 1;
        }
    }
    ranks
}

fn layout(data: &RenderData) -> HashMap<String, Point> {
    let ranks = assign_ranks(data);
    let mut rows: Vec<Vec<&RenderNode>> = Vec::new();
    for (node, &rank) in data.nodes.iter().zip(&ranks) {
        if rows.len() <= rank {
            rows.resize_with(rank + 1, Vec::new);
        }
        rows[rank].push(node);
    }

    let mut positions = HashMap::new();
    for (rank, members) in rows.iter().enumerate() {
        let offset = (members.len() as f64 - 1.0) / 2.0;
        for (row, node) in members.iter().enumerate() {
            positions.insert(
                node.id.clone(),
                Point::new(rank as f64 * LEVEL_SEPARATION, (row as f64 - offset) * ROW_SEPARATION),
            );
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::NodeGroup;

    fn node(id: &str, group: NodeGroup) -> RenderNode {
        RenderNode {
            id: id.into(),
            label: id.into(),
            group,
        }
    }

    fn edge(from: &str, to: &str) -> RenderEdge {
        RenderEdge {
            from: from.into(),
            to: to.into(),
        }
    }

    fn plant() -> RenderData {
        RenderData {
            nodes: vec![
                node("EstadoMicrobiano", NodeGroup::Hidden),
                node("CaudalReal", NodeGroup::Physical),
                node("ProduccionGasReal", NodeGroup::Physical),
                node("Gas_sensor", NodeGroup::Sensor),
            ],
            edges: vec![
                edge("EstadoMicrobiano", "ProduccionGasReal"),
                edge("CaudalReal", "ProduccionGasReal"),
                edge("ProduccionGasReal", "Gas_sensor"),
            ],
        }
    }

    #[test]
    fn ranks_follow_longest_path() {
        assert_eq!(assign_ranks(&plant()), vec![0, 0, 1, 2]);
    }

    #[test]
    fn cycles_do_not_hang() {
        let data = RenderData {
            nodes: vec![node("a", NodeGroup::Hidden), node("b", NodeGroup::Hidden)],
            edges: vec![edge("a", "b"), edge("b", "a")],
        };
        assert_eq!(assign_ranks(&data), vec![1, 1]);
    }

    #[test]
    fn fit_keeps_every_node_inside() {
        let surface = TerminalSurface::new(&plant(), Rect::new(0, 0, 80, 20));
        for n in surface.nodes() {
            let p = surface.project(surface.node_position(&n.id).unwrap());
            assert!(p.x >= 0.0 && p.x <= 80.0, "{} at x {}", n.id, p.x);
            assert!(p.y >= 0.0 && p.y <= 20.0, "{} at y {}", n.id, p.y);
        }
    }

    #[test]
    fn zoom_is_clamped_and_keeps_focus_fixed() {
        let mut surface = TerminalSurface::new(&plant(), Rect::new(0, 0, 80, 20));
        let focus = Point::new(40.0, 10.0);
        let under = surface.unproject(focus);

        surface.zoom_by(1.2, focus);
        let moved = surface.project(under);
        assert!((moved.x - focus.x).abs() < 1e-9 && (moved.y - focus.y).abs() < 1e-9);

        for _ in 0..50 {
            surface.zoom_by(1.2, focus);
        }
        assert_eq!(surface.camera.zoom, MAX_ZOOM);
    }

    #[test]
    fn labels_are_hit_tested() {
        let surface = TerminalSurface::new(&plant(), Rect::new(0, 0, 80, 20));
        let gas = &surface.nodes()[3];
        let (column, row, _) = surface.label_cell(gas).unwrap();
        let hit = surface.node_at(Point::new(column as f64 + 1.0, row as f64));
        assert_eq!(hit.as_deref(), Some("Gas_sensor"));
    }

    #[test]
    fn screen_coordinates_are_made_local() {
        let surface = TerminalSurface::new(&plant(), Rect::new(5, 3, 40, 10));
        assert_eq!(surface.to_local(5, 3), Some(Point::new(0.0, 0.0)));
        assert_eq!(surface.to_local(4, 3), None);
        assert_eq!(surface.to_local(45, 3), None);
    }

    #[test]
    fn factory_counts_instantiations() {
        let mut factory = TerminalSurfaceFactory::new(Rect::new(0, 0, 80, 20));
        let mut surface = factory.create(&plant());
        assert_eq!(factory.instantiated(), 1);
        surface.release();
        assert!(surface.released);
        assert!(surface.node_position("Gas_sensor").is_none());
    }
}
