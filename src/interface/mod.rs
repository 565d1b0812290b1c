pub mod canvas;
pub mod widgets;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;

use crate::models::config::DashboardConfig;
use crate::models::constants::SMALL_SCREEN_COLUMNS;
use crate::models::state::SelectionState;
use crate::models::types::{NodeGroup, PopupSize};
use crate::systems::cpt_loader::CptMap;
use crate::systems::diagnostics::Diagnostics;
use crate::utils::logging::{latest_log, LogLevel};

pub use self::canvas::{TerminalSurface, TerminalSurfaceFactory};
pub use self::widgets::{GraphView, ProbabilityBar};

const NEON_CYAN: Color = Color::Rgb(0, 255, 255);
const SYSTEM_BLUE: Color = Color::Rgb(41, 171, 226);
const NEON_YELLOW: Color = Color::Rgb(255, 255, 0);
const WARNING_COLOR: Color = Color::Rgb(255, 100, 0);

const SPINNER_FRAMES: [char; 6] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴'];

/// Everything a frame needs, borrowed from the dashboard.
pub struct ViewState<'a> {
    pub config: &'a DashboardConfig,
    pub diagnostics: &'a Diagnostics,
    pub surface: Option<&'a TerminalSurface>,
    pub selection: &'a SelectionState,
    pub cpts: &'a CptMap,
    pub popup: PopupSize,
    pub focused_sensor: usize,
    pub graph_modal: bool,
    pub inference_pending: bool,
    pub structure_error: Option<&'a str>,
    pub engine_label: &'a str,
    pub tick: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelLayout {
    pub header: Rect,
    /// Outer rect of the graph panel, absent on small screens outside the modal.
    pub graph: Option<Rect>,
    pub controls: Option<Rect>,
    pub footer: Rect,
}

pub fn panel_layout(size: Rect, graph_modal: bool) -> PanelLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3), Constraint::Length(1)])
        .split(size);
    let (header, body, footer) = (rows[0], rows[1], rows[2]);

    let (graph, controls) = if graph_modal {
        (Some(body), None)
    } else if size.width < SMALL_SCREEN_COLUMNS {
        (None, Some(body))
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(body);
        (Some(columns[0]), Some(columns[1]))
    };

    PanelLayout {
        header,
        graph,
        controls,
        footer,
    }
}

/// Inner drawing area of the graph panel, which is what the canvas works in.
pub fn graph_canvas(size: Rect, graph_modal: bool) -> Option<Rect> {
    panel_layout(size, graph_modal)
        .graph
        .map(|outer| Block::default().borders(Borders::ALL).inner(outer))
}

pub struct Interface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Interface {
    pub fn new() -> Result<Self, io::Error> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Interface { terminal })
    }

    pub fn size(&self) -> Result<Rect, io::Error> {
        self.terminal.size()
    }

    pub fn draw(&mut self, view: &ViewState) -> Result<(), io::Error> {
        self.terminal.draw(|f| render(f, view))?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> Result<(), io::Error> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

pub fn render(f: &mut Frame, view: &ViewState) {
    let layout = panel_layout(f.size(), view.graph_modal);

    draw_header(f, view, layout.header);
    if let Some(area) = layout.graph {
        draw_graph_panel(f, view, area);
    }
    if let Some(area) = layout.controls {
        draw_controls(f, view, area);
    }
    draw_status_bar(f, view, layout.footer);
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(NEON_CYAN))
        .title(Span::styled(
            title,
            Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD),
        ))
}

fn draw_header(f: &mut Frame, view: &ViewState, area: Rect) {
    let line = Line::from(vec![
        Span::styled("◢ BIODIGESTOR MONITOR ◣", Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(format!("engine: {}", view.engine_label), Style::default().fg(SYSTEM_BLUE)),
    ]);
    f.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM)), area);
}

fn draw_graph_panel(f: &mut Frame, view: &ViewState, area: Rect) {
    let title = if view.graph_modal {
        "◢ RED CAUSAL ◣ [g/Esc cerrar]"
    } else {
        "◢ RED CAUSAL ◣"
    };
    let block = titled_block(title);
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let surface = match view.surface {
        Some(surface) => surface,
        None => {
            let message = match view.structure_error {
                Some(err) => Span::styled(format!("Motor no disponible: {}", err), Style::default().fg(WARNING_COLOR)),
                None => Span::styled("Cargando estructura...", Style::default().fg(Color::DarkGray)),
            };
            f.render_widget(Paragraph::new(Line::from(message)).wrap(Wrap { trim: true }), inner);
            return;
        }
    };

    f.render_widget(GraphView::new(surface, view.selection.selected()), inner);
    draw_legend(f, inner);

    if let (Some(node_id), Some(placement)) = (view.selection.selected(), view.selection.placement()) {
        let rect = widgets::popup_rect(placement, view.popup, inner);
        let label = surface
            .nodes()
            .iter()
            .find(|n| n.id == node_id)
            .map(|n| n.label.as_str())
            .unwrap_or(node_id);
        let title = format!("CPT: {}", label);
        let body = Paragraph::new(widgets::cpt_lines(view.cpts.get(node_id)))
            .block(titled_block(&title))
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, rect);
        f.render_widget(body, rect);
        widgets::draw_popup_arrow(f.buffer_mut(), placement, rect);
    }
}

fn draw_legend(f: &mut Frame, inner: Rect) {
    if inner.height < 2 {
        return;
    }
    let spans: Vec<Span> = [NodeGroup::Hidden, NodeGroup::Physical, NodeGroup::Sensor]
        .iter()
        .flat_map(|g| {
            vec![
                Span::styled("■ ", Style::default().fg(widgets::group_color(*g))),
                Span::raw(format!("{}  ", g.display_name())),
            ]
        })
        .collect();
    let area = Rect {
        x: inner.x,
        y: inner.y + inner.height - 1,
        width: inner.width,
        height: 1,
    };
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_controls(f: &mut Frame, view: &ViewState, area: Rect) {
    let alerts = view.diagnostics.alerts();
    let sensor_height = view.config.sensors.len() as u16 + 2;
    let alert_height = if alerts.is_empty() { 0 } else { alerts.len() as u16 + 2 };

    let mut constraints = vec![Constraint::Length(sensor_height), Constraint::Length(alert_height)];
    constraints.extend(view.config.targets.iter().map(|_| Constraint::Min(4)));
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    draw_sensors(f, view, sections[0]);
    if !alerts.is_empty() {
        let lines: Vec<Line> = alerts
            .iter()
            .map(|hit| {
                Line::from(Span::styled(
                    format!("⚠ {}: {} {:.1}%", hit.target, hit.state, hit.probability * 100.0),
                    Style::default().fg(widgets::CRITICAL_COLOR).add_modifier(Modifier::BOLD),
                ))
            })
            .collect();
        let banner = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(widgets::CRITICAL_COLOR))
                .title("◢ ALERTA CRÍTICA ◣"),
        );
        f.render_widget(banner, sections[1]);
    }
    for (i, target) in view.config.targets.iter().enumerate() {
        draw_target(f, view, &target.id, &target.label, sections[2 + i]);
    }
}

fn draw_sensors(f: &mut Frame, view: &ViewState, area: Rect) {
    let lines: Vec<Line> = view
        .config
        .sensors
        .iter()
        .enumerate()
        .map(|(i, sensor)| {
            let value = view
                .diagnostics
                .evidence()
                .get(&sensor.id)
                .map(String::as_str)
                .unwrap_or("-");
            let focused = i == view.focused_sensor;
            let marker = if focused { "►" } else { " " };
            let value_style = if focused {
                Style::default().fg(NEON_YELLOW).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(SYSTEM_BLUE)
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(NEON_YELLOW)),
                Span::raw(format!(" {:<22}", sensor.label)),
                Span::styled(format!("◂ {} ▸", value), value_style),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(titled_block("◢ SENSORES ◣")), area);
}

fn draw_target(f: &mut Frame, view: &ViewState, id: &str, label: &str, area: Rect) {
    let block = titled_block(label);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let ranked = view.diagnostics.ranked(id);
    if ranked.is_empty() {
        let text = if view.inference_pending {
            format!("{} Calculando...", SPINNER_FRAMES[view.tick % SPINNER_FRAMES.len()])
        } else {
            "Sin datos".to_string()
        };
        f.render_widget(Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray))), inner);
        return;
    }

    for (row, state) in ranked.iter().enumerate() {
        if row as u16 >= inner.height {
            break;
        }
        let color = widgets::tone_color(state.tone);
        let text_width = 22.min(inner.width);
        let line_area = Rect {
            x: inner.x,
            y: inner.y + row as u16,
            width: text_width,
            height: 1,
        };
        let bar_area = Rect {
            x: inner.x + text_width,
            y: inner.y + row as u16,
            width: inner.width.saturating_sub(text_width),
            height: 1,
        };
        let text = Line::from(vec![
            Span::styled(format!("{:<14}", state.label), Style::default().fg(color)),
            Span::raw(format!("{:>6.1}%", state.probability * 100.0)),
        ]);
        f.render_widget(Paragraph::new(text), line_area);
        f.render_widget(ProbabilityBar::new(state.probability, color), bar_area);
    }
}

fn draw_status_bar(f: &mut Frame, view: &ViewState, area: Rect) {
    let updated = match view.diagnostics.updated_at() {
        Some(at) => format!("Actualizado {}", at.format("%H:%M:%S")),
        None => "Sin datos".to_string(),
    };
    let mut spans = vec![
        Span::styled(updated, Style::default().fg(NEON_CYAN)),
        Span::raw(" | "),
        Span::styled("q salir · ↑↓ sensor · ←→ valor · g grafo · n/p nodo · +/- zoom · f ajustar", Style::default().fg(SYSTEM_BLUE)),
    ];
    if let Some(entry) = latest_log() {
        let color = match entry.level {
            LogLevel::Error => widgets::CRITICAL_COLOR,
            LogLevel::Warning => WARNING_COLOR,
            LogLevel::Success => widgets::NOMINAL_COLOR,
            LogLevel::Info => Color::Gray,
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(entry.message, Style::default().fg(color)));
    }

    let status_bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::render_adapter::RenderData;
    use ratatui::backend::TestBackend;

    #[test]
    fn small_screens_hide_the_graph() {
        let small = panel_layout(Rect::new(0, 0, 80, 30), false);
        assert!(small.graph.is_none());
        assert!(small.controls.is_some());

        let modal = panel_layout(Rect::new(0, 0, 80, 30), true);
        assert!(modal.graph.is_some());
        assert!(modal.controls.is_none());

        let wide = panel_layout(Rect::new(0, 0, 160, 40), false);
        assert!(wide.graph.is_some() && wide.controls.is_some());
    }

    #[test]
    fn canvas_is_inside_graph_border() {
        let outer = panel_layout(Rect::new(0, 0, 160, 40), false).graph.unwrap();
        let inner = graph_canvas(Rect::new(0, 0, 160, 40), false).unwrap();
        assert_eq!(inner.x, outer.x + 1);
        assert_eq!(inner.width, outer.width - 2);
    }

    #[test]
    fn renders_without_results() {
        let config = DashboardConfig::default();
        let diagnostics = Diagnostics::new(config.clone());
        let selection = SelectionState::new();
        let cpts = CptMap::new();
        let surface = TerminalSurface::new(&RenderData::default(), Rect::new(1, 4, 110, 30));
        let view = ViewState {
            config: &config,
            diagnostics: &diagnostics,
            surface: Some(&surface),
            selection: &selection,
            cpts: &cpts,
            popup: PopupSize::new(46.0, 16.0),
            focused_sensor: 0,
            graph_modal: false,
            inference_pending: false,
            structure_error: None,
            engine_label: "local",
            tick: 0,
        };

        let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
        terminal.draw(|f| render(f, &view)).unwrap();
        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|c| c.symbol.as_str()).collect();
        assert!(content.contains("Sin datos"));
        assert!(content.contains("SENSORES"));
    }
}
