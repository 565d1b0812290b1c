// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::api::engine_client::BayesEngine;
use crate::error::DashboardError;
use crate::interface::{graph_canvas, Interface, TerminalSurfaceFactory, ViewState};
use crate::models::config::DashboardConfig;
use crate::models::constants::{
    INPUT_POLL_MS, REDRAW_TICK_MS, ZOOM_STEP,
};
use crate::models::types::{GraphStructure, Point, PopupSize};
use crate::server::{DashboardSnapshot, SnapshotHub};
use crate::systems::cpt_loader::{load_all, CptMap};
use crate::systems::diagnostics::{run_inference, Diagnostics, InferenceOutcome, InferenceRequest};
use crate::systems::placement::PlacementConfig;
use crate::systems::render_adapter::{GraphRenderAdapter, RenderSurface, SurfaceEvent};
use crate::utils::logging::{
    capture_logs, log_error, log_footer, log_header, log_info, log_metric, log_success, log_warning,
};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

pub enum Message {
    Inferred(InferenceOutcome),
    Structure {
        instance: Uuid,
        result: Result<GraphStructure, String>,
    },
    Cpts {
        instance: Uuid,
        cpts: CptMap,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct Gesture {
    node: Option<String>,
    last: Point,
    moved: bool,
}

pub struct Dashboard {
    engine: Arc<dyn BayesEngine>,
    engine_label: String,
    diagnostics: Diagnostics,
    adapter: GraphRenderAdapter<TerminalSurfaceFactory>,
    structure_instance: Option<Uuid>,
    structure_error: Option<String>,
    cpts: CptMap,
    focused_sensor: usize,
    graph_modal: bool,
    pending: usize,
    gesture: Option<Gesture>,
    hub: Option<SnapshotHub>,
    tick: usize,
}

impl Dashboard {
    pub fn new(
        engine: Arc<dyn BayesEngine>,
        engine_label: &str,
        config: DashboardConfig,
        hub: Option<SnapshotHub>,
    ) -> Self {
        Self {
            engine,
            engine_label: engine_label.to_string(),
            diagnostics: Diagnostics::new(config),
            adapter: GraphRenderAdapter::new(
                TerminalSurfaceFactory::new(Rect::default()),
                PopupSize::terminal(),
                PlacementConfig::terminal(),
            ),
            structure_instance: None,
            structure_error: None,
            cpts: CptMap::new(),
            focused_sensor: 0,
            graph_modal: false,
            pending: 0,
            gesture: None,
            hub,
            tick: 0,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn adapter(&self) -> &GraphRenderAdapter<TerminalSurfaceFactory> {
        &self.adapter
    }

    pub fn cpts(&self) -> &CptMap {
        &self.cpts
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), DashboardError> {
        self.diagnostics.config().validate()?;
        capture_logs(true);
        let mut interface = Interface::new()?;
        let result = self.event_loop(&mut interface, &mut shutdown).await;
        let cleanup = interface.cleanup();
        capture_logs(false);
        result?;
        cleanup?;
        Ok(())
    }

    async fn event_loop(
        &mut self,
        interface: &mut Interface,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), DashboardError> {
        let (tx, mut rx) = mpsc::channel::<Message>(64);
        let (input_tx, mut input_rx) = mpsc::channel::<Event>(256);
        let reading = Arc::new(AtomicBool::new(true));
        let reader = spawn_input_reader(input_tx, Arc::clone(&reading));

        self.spawn_structure_fetch(&tx);
        self.spawn_inference(self.diagnostics.request(), &tx);
        self.publish();

        let mut redraw = tokio::time::interval(Duration::from_millis(REDRAW_TICK_MS));
        let outcome = loop {
            tokio::select! {
                Some(ev) = input_rx.recv() => {
                    if self.handle_event(ev, &tx) == Flow::Quit {
                        break Ok(());
                    }
                }
                Some(msg) = rx.recv() => self.handle_message(msg, &tx),
                _ = redraw.tick() => self.tick = self.tick.wrapping_add(1),
                _ = shutdown.recv() => break Ok(()),
            }

            if let Err(e) = self.draw(interface) {
                break Err(DashboardError::from(e));
            }
        };

        reading.store(false, Ordering::SeqCst);
        if let Err(e) = reader.await {
            log_warning(&format!("Input reader ended abnormally: {}", e));
        }
        outcome
    }

    fn draw(&mut self, interface: &mut Interface) -> std::io::Result<()> {
        let size = interface.size()?;
        // A hidden graph panel gets an empty area so clicks never hit it.
        let canvas = graph_canvas(size, self.graph_modal).unwrap_or_default();
        let resized = self
            .adapter
            .surface_mut()
            .map_or(false, |surface| surface.set_area(canvas));
        if resized {
            self.adapter.refresh_placement();
        }

        let view = ViewState {
            config: self.diagnostics.config(),
            diagnostics: &self.diagnostics,
            surface: self.adapter.surface(),
            selection: self.adapter.selection(),
            cpts: &self.cpts,
            popup: self.adapter.popup_size(),
            focused_sensor: self.focused_sensor,
            graph_modal: self.graph_modal,
            inference_pending: self.pending > 0,
            structure_error: self.structure_error.as_deref(),
            engine_label: &self.engine_label,
            tick: self.tick,
        };
        interface.draw(&view)
    }

    pub fn handle_event(&mut self, ev: Event, tx: &mpsc::Sender<Message>) -> Flow {
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let flow = self.handle_key(key, tx);
                self.publish();
                flow
            }
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse);
                Flow::Continue
            }
            _ => Flow::Continue,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<Message>) -> Flow {
        let sensor_count = self.diagnostics.config().sensors.len();
        match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Flow::Quit,
            KeyCode::Up if sensor_count > 0 => {
                self.focused_sensor = (self.focused_sensor + sensor_count - 1) % sensor_count;
            }
            KeyCode::Down if sensor_count > 0 => {
                self.focused_sensor = (self.focused_sensor + 1) % sensor_count;
            }
            KeyCode::Left => self.change_focused_sensor(-1, tx),
            KeyCode::Right => self.change_focused_sensor(1, tx),
            KeyCode::Char('g') => self.graph_modal = !self.graph_modal,
            KeyCode::Esc => {
                if self.adapter.selection().selected().is_some() {
                    self.adapter.handle(SurfaceEvent::Close);
                } else {
                    self.graph_modal = false;
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_centre(ZOOM_STEP),
            KeyCode::Char('-') => self.zoom_centre(1.0 / ZOOM_STEP),
            KeyCode::Char('f') => {
                if let Some(surface) = self.adapter.surface_mut() {
                    surface.fit();
                    self.adapter.handle(SurfaceEvent::Zoom);
                }
            }
            KeyCode::Char('n') => self.cycle_node(1),
            KeyCode::Char('p') => self.cycle_node(-1),
            KeyCode::Char('r') => {
                log_info("Refreshing graph structure");
                self.spawn_structure_fetch(tx);
            }
            _ => {}
        }
        Flow::Continue
    }

    fn change_focused_sensor(&mut self, step: isize, tx: &mpsc::Sender<Message>) {
        if let Some(request) = self.diagnostics.cycle_sensor(self.focused_sensor, step) {
            self.spawn_inference(request, tx);
        }
    }

    fn zoom_centre(&mut self, factor: f64) {
        if let Some(surface) = self.adapter.surface_mut() {
            let viewport = surface.viewport();
            surface.zoom_by(factor, Point::new(viewport.width / 2.0, viewport.height / 2.0));
            self.adapter.handle(SurfaceEvent::Zoom);
        }
    }

    fn cycle_node(&mut self, step: isize) {
        let ids = match self.adapter.surface() {
            Some(surface) => surface.node_ids(),
            None => return,
        };
        if ids.is_empty() {
            return;
        }
        let count = ids.len() as isize;
        let next = match self
            .adapter
            .selection()
            .selected()
            .and_then(|current| ids.iter().position(|id| id == current))
        {
            Some(index) => (index as isize + step).rem_euclid(count) as usize,
            None if step > 0 => 0,
            None => ids.len() - 1,
        };
        self.adapter.handle(SurfaceEvent::Click {
            node: Some(ids[next].clone()),
        });
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let local = match self.adapter.surface() {
            Some(surface) if self.graph_visible() => surface.to_local(mouse.column, mouse.row),
            _ => None,
        };

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.gesture = local.map(|at| Gesture {
                    node: self.adapter.surface().and_then(|s| s.node_at(at)),
                    last: at,
                    moved: false,
                });
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let (Some(gesture), Some(at)) = (self.gesture.as_mut(), local) else {
                    return;
                };
                if !gesture.moved {
                    gesture.moved = true;
                    self.adapter.handle(SurfaceEvent::DragStart {
                        node: gesture.node.clone(),
                    });
                }
                let (dx, dy) = (at.x - gesture.last.x, at.y - gesture.last.y);
                gesture.last = at;
                let node = gesture.node.clone();
                if let Some(surface) = self.adapter.surface_mut() {
                    match node {
                        Some(id) => surface.move_node(&id, dx, dy),
                        None => surface.pan_by(dx, dy),
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(gesture) = self.gesture.take() {
                    let event = if gesture.moved {
                        SurfaceEvent::DragEnd { node: gesture.node }
                    } else {
                        SurfaceEvent::Click { node: gesture.node }
                    };
                    self.adapter.handle(event);
                    self.publish();
                }
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let Some(at) = local else {
                    return;
                };
                let factor = if mouse.kind == MouseEventKind::ScrollUp {
                    ZOOM_STEP
                } else {
                    1.0 / ZOOM_STEP
                };
                if let Some(surface) = self.adapter.surface_mut() {
                    surface.zoom_by(factor, at);
                }
                self.adapter.handle(SurfaceEvent::Zoom);
                self.publish();
            }
            _ => {}
        }
    }

    fn graph_visible(&self) -> bool {
        self.adapter
            .surface()
            .map_or(false, |s| s.area().width > 0 && s.area().height > 0)
    }

    pub fn handle_message(&mut self, msg: Message, tx: &mpsc::Sender<Message>) {
        match msg {
            Message::Inferred(outcome) => {
                self.pending = self.pending.saturating_sub(1);
                if self.diagnostics.apply(outcome) {
                    for hit in self.diagnostics.alerts() {
                        log_warning(&format!(
                            "ALERTA {}: {} {:.1}%",
                            hit.target,
                            hit.state,
                            hit.probability * 100.0
                        ));
                    }
                    self.publish();
                }
            }
            Message::Structure { instance, result } => match result {
                Ok(structure) => {
                    self.structure_error = None;
                    self.structure_instance = Some(instance);
                    if self.adapter.sync_structure(&structure) {
                        log_success(&format!(
                            "Graph loaded: {} nodes, {} edges",
                            structure.nodes.len(),
                            structure.edges.len()
                        ));
                        self.cpts.clear();
                        self.spawn_cpt_fetch(instance, structure, tx);
                    }
                }
                Err(e) => {
                    log_error(&format!("Could not load graph structure: {}", e));
                    self.structure_error = Some(e);
                }
            },
            Message::Cpts { instance, cpts } => {
                if self.structure_instance == Some(instance) {
                    self.cpts = cpts;
                }
            }
        }
    }

    pub fn spawn_inference(&mut self, request: InferenceRequest, tx: &mpsc::Sender<Message>) {
        self.pending += 1;
        let engine = Arc::clone(&self.engine);
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = run_inference(engine.as_ref(), request).await;
            let _ = tx.send(Message::Inferred(outcome)).await;
        });
    }

    pub fn spawn_structure_fetch(&self, tx: &mpsc::Sender<Message>) {
        let engine = Arc::clone(&self.engine);
        let tx = tx.clone();
        tokio::spawn(async move {
            let instance = engine.instance_id();
            let result = engine.graph_structure().await.map_err(|e| e.to_string());
            let _ = tx.send(Message::Structure { instance, result }).await;
        });
    }

    fn spawn_cpt_fetch(&self, instance: Uuid, structure: GraphStructure, tx: &mpsc::Sender<Message>) {
        let engine = Arc::clone(&self.engine);
        let tx = tx.clone();
        tokio::spawn(async move {
            let cpts = load_all(engine.as_ref(), &structure.nodes).await;
            let _ = tx.send(Message::Cpts { instance, cpts }).await;
        });
    }

    fn publish(&self) {
        if let Some(hub) = &self.hub {
            hub.publish(DashboardSnapshot::capture(
                &self.diagnostics,
                self.adapter.selection().selected(),
            ));
        }
    }
}

fn spawn_input_reader(tx: mpsc::Sender<Event>, reading: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while reading.load(Ordering::SeqCst) {
            match event::poll(Duration::from_millis(INPUT_POLL_MS)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log_error(&format!("Terminal read failed: {}", e));
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    log_error(&format!("Terminal poll failed: {}", e));
                    break;
                }
            }
        }
    })
}

/// One inference pass for the given evidence, reported through the log
/// helpers. Returns whether a critical alert was raised.
pub async fn run_headless(
    engine: &dyn BayesEngine,
    config: DashboardConfig,
    overrides: &[(String, String)],
) -> Result<bool, DashboardError> {
    config.validate()?;
    let mut diagnostics = Diagnostics::new(config);
    for (sensor, value) in overrides {
        diagnostics.set_evidence(sensor, value)?;
    }

    log_header("DIAGNOSTICO");
    for (sensor, value) in diagnostics.evidence() {
        log_metric(sensor, value);
    }

    let outcome = run_inference(engine, diagnostics.request()).await;
    diagnostics.apply(outcome);

    for target in &diagnostics.config().targets {
        let ranked = diagnostics.ranked(&target.id);
        if ranked.is_empty() {
            log_warning(&format!("{}: Sin datos", target.label));
            continue;
        }
        for state in ranked {
            log_metric(
                &format!("{} / {}", target.label, state.label),
                format!("{:.1}%", state.probability * 100.0),
            );
        }
    }

    let alerts = diagnostics.alerts();
    for hit in &alerts {
        log_error(&format!(
            "ALERTA CRÍTICA {}: {} {:.1}%",
            hit.target,
            hit.state,
            hit.probability * 100.0
        ));
    }
    if alerts.is_empty() {
        log_success("Sin alertas críticas");
    }
    log_footer();

    Ok(!alerts.is_empty())
}
