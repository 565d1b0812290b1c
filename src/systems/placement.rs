// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::models::constants::{POPUP_FIT_BUFFER, POPUP_MARGIN, POPUP_STANDOFF};
use crate::models::types::{Point, PopupSize, Viewport};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

/// Where the popup hangs off its node.
///
/// The anchor is the popup edge midpoint facing the node: top-center for
/// `Bottom`, bottom-center for `Top`, left-middle for `Right` and
/// right-middle for `Left`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Placement {
    pub anchor: Point,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementConfig {
    pub margin: f64,
    /// Extra room required on top of the popup extent before a side counts as fitting.
    pub fit_buffer: f64,
    /// Gap between the node centre and the anchor.
    pub standoff: f64,
}

impl PlacementConfig {
    pub fn terminal() -> Self {
        Self {
            margin: POPUP_MARGIN,
            fit_buffer: POPUP_FIT_BUFFER,
            standoff: POPUP_STANDOFF,
        }
    }

    #[cfg(test)]
    pub(crate) fn pixels() -> Self {
        use crate::models::constants::{PIXEL_FIT_BUFFER, PIXEL_MARGIN, PIXEL_STANDOFF};
        Self {
            margin: PIXEL_MARGIN,
            fit_buffer: PIXEL_FIT_BUFFER,
            standoff: PIXEL_STANDOFF,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self::terminal()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clearance {
    pub above: f64,
    pub below: f64,
    pub left: f64,
    pub right: f64,
}

pub fn clearance(at: Point, viewport: Viewport, margin: f64) -> Clearance {
    Clearance {
        above: at.y - margin,
        below: viewport.height - at.y - margin,
        left: at.x - margin,
        right: viewport.width - at.x - margin,
    }
}

pub fn choose_direction(room: &Clearance, popup: PopupSize, fit_buffer: f64) -> Direction {
    let fits_vertically = |space: f64| space >= popup.height + fit_buffer;
    let fits_horizontally = |space: f64| space >= popup.width + fit_buffer;

    if fits_vertically(room.below) {
        Direction::Bottom
    } else if fits_vertically(room.above) {
        Direction::Top
    } else if fits_horizontally(room.right) {
        Direction::Right
    } else if fits_horizontally(room.left) {
        Direction::Left
    } else if room.below > room.above {
        Direction::Bottom
    } else {
        Direction::Top
    }
}

pub fn compute_placement<F>(
    node: Point,
    to_viewport: F,
    viewport: Viewport,
    popup: PopupSize,
    config: &PlacementConfig,
) -> Placement
where
    F: Fn(Point) -> Point,
{
    let at = to_viewport(node);
    let room = clearance(at, viewport, config.margin);
    let direction = choose_direction(&room, popup, config.fit_buffer);

    let mut anchor = match direction {
        Direction::Top => Point::new(at.x, at.y - config.standoff),
        Direction::Bottom => Point::new(at.x, at.y + config.standoff),
        Direction::Left => Point::new(at.x - config.standoff, at.y),
        Direction::Right => Point::new(at.x + config.standoff, at.y),
    };

    let margin = config.margin;
    match direction {
        Direction::Top | Direction::Bottom => {
            let half = popup.width / 2.0;
            anchor.x = clamp_span(anchor.x, margin + half, viewport.width - margin - half);
            anchor.y = clamp_span(anchor.y, margin, viewport.height - margin);
        }
        Direction::Left | Direction::Right => {
            let half = popup.height / 2.0;
            anchor.y = clamp_span(anchor.y, margin + half, viewport.height - margin - half);
            anchor.x = clamp_span(anchor.x, margin, viewport.width - margin);
        }
    }

    Placement { anchor, direction }
}

impl Placement {
    /// Top-left corner of the popup box.
    pub fn origin(&self, popup: PopupSize) -> Point {
        let Point { x, y } = self.anchor;
        match self.direction {
            Direction::Bottom => Point::new(x - popup.width / 2.0, y),
            Direction::Top => Point::new(x - popup.width / 2.0, y - popup.height),
            Direction::Right => Point::new(x, y - popup.height / 2.0),
            Direction::Left => Point::new(x - popup.width, y - popup.height / 2.0),
        }
    }
}

// Centres when the popup is larger than the span it must fit in.
fn clamp_span(value: f64, low: f64, high: f64) -> f64 {
    if low > high {
        (low + high) / 2.0
    } else {
        value.clamp(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn popup() -> PopupSize {
        PopupSize::pixels()
    }

    fn place(x: f64, y: f64) -> Placement {
        compute_placement(Point::new(x, y), |p| p, viewport(), popup(), &PlacementConfig::pixels())
    }

    fn assert_horizontally_inside(placement: &Placement) {
        let origin = placement.origin(popup());
        assert!(origin.x >= 20.0, "left edge {} crosses margin", origin.x);
        assert!(origin.x + popup().width <= 780.0, "right edge crosses margin");
    }

    #[test]
    fn prefers_bottom_when_it_fits() {
        let placement = place(400.0, 100.0);
        assert_eq!(placement.direction, Direction::Bottom);
        assert_eq!(placement.anchor, Point::new(400.0, 140.0));
        assert_horizontally_inside(&placement);
    }

    #[test]
    fn corner_node_still_gets_a_valid_placement() {
        let placement = place(10.0, 10.0);
        assert_eq!(placement.direction, Direction::Bottom);
        assert_eq!(placement.anchor.x, 180.0);
        assert!(placement.anchor.y >= 20.0 && placement.anchor.y <= 580.0);
        assert_horizontally_inside(&placement);
    }

    #[test]
    fn right_edge_overflow_is_shifted_inward() {
        let placement = place(790.0, 100.0);
        assert_eq!(placement.anchor.x, 620.0);
        assert_horizontally_inside(&placement);
    }

    #[test]
    fn falls_back_to_top_when_bottom_is_short() {
        let placement = place(400.0, 500.0);
        assert_eq!(placement.direction, Direction::Top);
        assert_eq!(placement.anchor, Point::new(400.0, 460.0));
    }

    #[test]
    fn priority_beats_raw_space() {
        // Right has far more room than below, but below fits and wins.
        let placement = place(20.0, 200.0);
        assert_eq!(placement.direction, Direction::Bottom);
    }

    #[test]
    fn horizontal_sides_when_neither_vertical_fits() {
        let right = place(100.0, 300.0);
        assert_eq!(right.direction, Direction::Right);
        assert_eq!(right.anchor, Point::new(140.0, 300.0));

        let left = place(700.0, 300.0);
        assert_eq!(left.direction, Direction::Left);
        assert_eq!(left.anchor, Point::new(660.0, 300.0));
    }

    #[test]
    fn horizontal_placements_clamp_vertically() {
        let small = Viewport::new(800.0, 320.0);
        let placement = compute_placement(
            Point::new(100.0, 60.0),
            |p| p,
            small,
            PopupSize::new(320.0, 200.0),
            &PlacementConfig::pixels(),
        );
        assert_eq!(placement.direction, Direction::Right);
        assert_eq!(placement.anchor.y, 120.0);
        assert_eq!(placement.origin(PopupSize::new(320.0, 200.0)).y, 20.0);
    }

    #[test]
    fn nothing_fits_picks_roomier_vertical_side() {
        let cramped = Viewport::new(400.0, 320.0);
        let config = PlacementConfig::pixels();

        let upper = compute_placement(Point::new(200.0, 150.0), |p| p, cramped, popup(), &config);
        assert_eq!(upper.direction, Direction::Bottom);

        let lower = compute_placement(Point::new(200.0, 170.0), |p| p, cramped, popup(), &config);
        assert_eq!(lower.direction, Direction::Top);

        // Ties go to the top.
        let middle = compute_placement(Point::new(200.0, 160.0), |p| p, cramped, popup(), &config);
        assert_eq!(middle.direction, Direction::Top);
    }

    #[test]
    fn projection_is_applied_before_measuring() {
        let zoomed = |p: Point| Point::new(p.x * 2.0 + 50.0, p.y * 2.0 + 50.0);
        let placement = compute_placement(
            Point::new(150.0, 25.0),
            zoomed,
            viewport(),
            popup(),
            &PlacementConfig::pixels(),
        );
        assert_eq!(placement.direction, Direction::Bottom);
        assert_eq!(placement.anchor, Point::new(350.0, 140.0));
    }

    #[test]
    fn placement_is_deterministic() {
        let runs: Vec<Placement> = (0..5).map(|_| place(613.0, 487.0)).collect();
        assert!(runs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn oversized_popup_is_centred() {
        let tiny = Viewport::new(200.0, 600.0);
        let placement = compute_placement(Point::new(30.0, 50.0), |p| p, tiny, popup(), &PlacementConfig::pixels());
        assert_eq!(placement.anchor.x, 100.0);
    }
}
