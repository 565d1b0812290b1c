// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::interface::canvas::TerminalSurface;
use crate::models::constants::{CONJUNCTION, ROOT_LABEL};
use crate::models::types::{NodeGroup, PopupSize};
use crate::systems::cpt::NormalizedCpt;
use crate::systems::cpt_loader::CptEntry;
use crate::systems::diagnostics::StateTone;
use crate::systems::key_format::format_key;
use crate::systems::placement::{Direction, Placement};
use crate::systems::render_adapter::RenderSurface;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

pub const CRITICAL_COLOR: Color = Color::Rgb(255, 80, 80);
pub const NOMINAL_COLOR: Color = Color::Rgb(0, 255, 150);
pub const NEUTRAL_COLOR: Color = Color::Rgb(41, 171, 226);
const EDGE_COLOR: Color = Color::Rgb(70, 70, 70);

pub fn tone_color(tone: StateTone) -> Color {
    match tone {
        StateTone::Critical => CRITICAL_COLOR,
        StateTone::Nominal => NOMINAL_COLOR,
        StateTone::Neutral => NEUTRAL_COLOR,
    }
}

pub fn group_color(group: NodeGroup) -> Color {
    match group {
        NodeGroup::Hidden => Color::Rgb(200, 120, 255),
        NodeGroup::Physical => Color::Rgb(255, 200, 0),
        NodeGroup::Sensor => Color::Rgb(0, 255, 255),
    }
}

pub struct ProbabilityBar {
    probability: f64,
    color: Color,
}

impl ProbabilityBar {
    pub fn new(probability: f64, color: Color) -> Self {
        ProbabilityBar {
            probability: probability.clamp(0.0, 1.0),
            color,
        }
    }
}

impl Widget for ProbabilityBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let width = area.width as usize;
        let filled = (self.probability * width as f64).round() as usize;

        for x in 0..width {
            let (symbol, color) = if x < filled {
                ('█', self.color)
            } else {
                ('░', Color::DarkGray)
            };
            buf.get_mut(area.x + x as u16, area.y)
                .set_char(symbol)
                .set_style(Style::default().fg(color));
        }
    }
}

/// Edges as dotted lines, node labels on top.
pub struct GraphView<'a> {
    surface: &'a TerminalSurface,
    selected: Option<&'a str>,
}

impl<'a> GraphView<'a> {
    pub fn new(surface: &'a TerminalSurface, selected: Option<&'a str>) -> Self {
        GraphView { surface, selected }
    }
}

impl Widget for GraphView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let put = |buf: &mut Buffer, x: i32, y: i32, ch: char, style: Style| {
            if x >= 0 && y >= 0 && (x as u16) < area.width && (y as u16) < area.height {
                buf.get_mut(area.x + x as u16, area.y + y as u16)
                    .set_char(ch)
                    .set_style(style);
            }
        };

        for edge in self.surface.edges() {
            let (from, to) = match (
                self.surface.node_position(&edge.from),
                self.surface.node_position(&edge.to),
            ) {
                (Some(a), Some(b)) => (self.surface.project(a), self.surface.project(b)),
                _ => continue,
            };
            let steps = (to.x - from.x).abs().max((to.y - from.y).abs()).ceil() as i32;
            for i in 0..=steps {
                let t = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
                let x = (from.x + (to.x - from.x) * t).round() as i32;
                let y = (from.y + (to.y - from.y) * t).round() as i32;
                let ch = if i == steps { '►' } else { '·' };
                put(buf, x, y, ch, Style::default().fg(EDGE_COLOR));
            }
        }

        for node in self.surface.nodes() {
            let Some((column, row, _)) = self.surface.label_cell(node) else {
                continue;
            };
            let mut style = Style::default().fg(group_color(node.group)).add_modifier(Modifier::BOLD);
            if self.selected == Some(node.id.as_str()) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let text = format!("[{}]", node.label);
            for (i, ch) in text.chars().enumerate() {
                put(buf, column + i as i32, row, ch, style);
            }
        }
    }
}

/// Screen rectangle of a placed popup, kept inside `panel`.
pub fn popup_rect(placement: &Placement, popup: PopupSize, panel: Rect) -> Rect {
    let origin = placement.origin(popup);
    let width = (popup.width.round() as u16).min(panel.width);
    let height = (popup.height.round() as u16).min(panel.height);
    let max_x = panel.width.saturating_sub(width) as f64;
    let max_y = panel.height.saturating_sub(height) as f64;
    Rect {
        x: panel.x + origin.x.round().clamp(0.0, max_x) as u16,
        y: panel.y + origin.y.round().clamp(0.0, max_y) as u16,
        width,
        height,
    }
}

/// Arrow on the popup border pointing back at the node.
pub fn draw_popup_arrow(buf: &mut Buffer, placement: &Placement, rect: Rect) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let mid_x = rect.x + rect.width / 2;
    let mid_y = rect.y + rect.height / 2;
    let (x, y, ch) = match placement.direction {
        Direction::Bottom => (mid_x, rect.y, '▲'),
        Direction::Top => (mid_x, rect.y + rect.height - 1, '▼'),
        Direction::Right => (rect.x, mid_y, '◀'),
        Direction::Left => (rect.x + rect.width - 1, mid_y, '▶'),
    };
    buf.get_mut(x, y)
        .set_char(ch)
        .set_style(Style::default().fg(Color::Rgb(255, 200, 0)).add_modifier(Modifier::BOLD));
}

fn percent(p: f64) -> String {
    format!("{:>5.1}%", p * 100.0)
}

/// Popup body for a node's table.
pub fn cpt_lines(entry: Option<&CptEntry>) -> Vec<Line<'static>> {
    let muted = Style::default().fg(Color::DarkGray);
    let heading = Style::default().fg(Color::Rgb(0, 200, 255)).add_modifier(Modifier::BOLD);

    match entry {
        None => vec![Line::from(Span::styled("Cargando CPT...", muted))],
        Some(CptEntry::Unavailable) => vec![Line::from(Span::styled("Tabla no disponible (sin datos)", muted))],
        Some(CptEntry::UnknownFormat(reason)) => vec![
            Line::from(Span::styled("Formato desconocido", Style::default().fg(CRITICAL_COLOR))),
            Line::from(Span::styled(reason.clone(), muted)),
        ],
        Some(CptEntry::Table(NormalizedCpt::Root { possible_values })) => {
            let mut lines = vec![Line::from(Span::styled("Nodo Raíz (Sin padres)", heading))];
            lines.extend(possible_values.iter().map(|v| Line::from(format!("  · {}", v))));
            lines
        }
        Some(CptEntry::Table(NormalizedCpt::Discrete(cpt))) => {
            let mut lines = vec![
                Line::from(Span::styled("Estados definidos", muted)),
                Line::from(format!("  {}", cpt.possible_values.join(", "))),
            ];
            for (key, dist) in &cpt.table {
                lines.push(Line::from(Span::styled(format_key(Some(key.as_str())), heading)));
                for (state, p) in dist {
                    lines.push(Line::from(vec![
                        Span::raw(format!("  {:<14}", state)),
                        Span::styled(percent(*p), Style::default().fg(NEUTRAL_COLOR)),
                    ]));
                }
            }
            lines
        }
        Some(CptEntry::Table(NormalizedCpt::Binary(cpt))) => cpt
            .table
            .iter()
            .map(|entry| {
                let parents = if entry.parents.is_empty() {
                    ROOT_LABEL.to_string()
                } else {
                    entry.parents.join(CONJUNCTION)
                };
                Line::from(vec![
                    Span::styled(format!("{:<20}", parents), heading),
                    Span::styled(format!(" V {}", percent(entry.probability_true)), Style::default().fg(NOMINAL_COLOR)),
                    Span::styled(format!(" F {}", percent(entry.probability_false)), Style::default().fg(CRITICAL_COLOR)),
                ])
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Point;
    use crate::systems::cpt::normalize;
    use serde_json::json;

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect()
    }

    #[test]
    fn bar_fills_proportionally() {
        let area = Rect::new(0, 0, 10, 1);
        let mut buf = Buffer::empty(area);
        ProbabilityBar::new(0.72, CRITICAL_COLOR).render(area, &mut buf);
        let filled = (0..10).filter(|&x| buf.get(x, 0).symbol == "█").count();
        assert_eq!(filled, 7);
    }

    #[test]
    fn discrete_popup_uses_readable_keys() {
        let raw = json!({"Discrete": {
            "node_possible_values": ["Baja", "Normal", "Alta"],
            "table": [
                [[{"Value": "Bueno"}, {"Value": "Bajo"}], [[{"Value": "Baja"}, 0.4], [{"Value": "Normal"}, 0.6]]]
            ]
        }});
        let entry = CptEntry::Table(normalize(&raw).unwrap());
        let lines = text(&cpt_lines(Some(&entry)));
        assert_eq!(lines[0], "Estados definidos");
        assert_eq!(lines[1], "  Baja, Normal, Alta");
        assert_eq!(lines[2], "Bueno ∧ Bajo");
        assert!(lines[3].contains("Baja") && lines[3].contains("40.0%"));
    }

    #[test]
    fn three_missing_states_read_differently() {
        let root = CptEntry::Table(NormalizedCpt::Root { possible_values: vec!["Bueno".into()] });
        let unavailable = text(&cpt_lines(Some(&CptEntry::Unavailable)));
        let unknown = text(&cpt_lines(Some(&CptEntry::UnknownFormat("no tag".into()))));
        let root = text(&cpt_lines(Some(&root)));
        assert_eq!(root[0], "Nodo Raíz (Sin padres)");
        assert_eq!(unknown[0], "Formato desconocido");
        assert_ne!(unavailable[0], root[0]);
    }

    #[test]
    fn popup_rect_stays_in_panel() {
        let panel = Rect::new(10, 5, 60, 20);
        let placement = Placement {
            anchor: Point::new(58.0, 3.0),
            direction: Direction::Bottom,
        };
        let rect = popup_rect(&placement, PopupSize::new(46.0, 16.0), panel);
        assert!(rect.x >= panel.x && rect.x + rect.width <= panel.x + panel.width);
        assert!(rect.y >= panel.y && rect.y + rect.height <= panel.y + panel.height);
    }
}
