// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use warp::Filter;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use chrono::Local;

use crate::models::types::{EvidenceAssignment, InferenceResult};
use crate::systems::diagnostics::{AlertHit, Diagnostics, RankedState};
use crate::utils::logging::{log_info, log_warning};

#[derive(Clone, Debug, Default, Serialize)]
pub struct DashboardSnapshot {
    pub timestamp: String,
    pub evidence: EvidenceAssignment,
    pub results: InferenceResult,
    pub ranked: BTreeMap<String, Vec<RankedState>>,
    pub alerts: Vec<AlertHit>,
    pub selected_node: Option<String>,
    pub updated_at: Option<String>,
}

impl DashboardSnapshot {
    pub fn capture(diagnostics: &Diagnostics, selected_node: Option<&str>) -> Self {
        let ranked = diagnostics
            .config()
            .targets
            .iter()
            .map(|t| (t.id.clone(), diagnostics.ranked(&t.id)))
            .collect();

        DashboardSnapshot {
            timestamp: Local::now().to_rfc3339(),
            evidence: diagnostics.evidence().clone(),
            results: diagnostics.results().clone(),
            ranked,
            alerts: diagnostics.alerts(),
            selected_node: selected_node.map(str::to_string),
            updated_at: diagnostics.updated_at().map(|at| at.to_rfc3339()),
        }
    }
}

/// Latest snapshot plus a fan-out channel for live subscribers.
#[derive(Clone)]
pub struct SnapshotHub {
    latest: Arc<Mutex<DashboardSnapshot>>,
    tx: broadcast::Sender<DashboardSnapshot>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            latest: Arc::new(Mutex::new(DashboardSnapshot::default())),
            tx,
        }
    }

    pub fn publish(&self, snapshot: DashboardSnapshot) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = snapshot.clone();
        }
        // No subscribers is fine.
        let _ = self.tx.send(snapshot);
    }

    pub fn latest(&self) -> DashboardSnapshot {
        self.latest.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new()
    }
}

pub fn routes(
    hub: SnapshotHub,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let hub_filter = warp::any().map(move || hub.clone());

    let snapshot_route = warp::path("snapshot")
        .and(warp::path::end())
        .and(warp::get())
        .and(hub_filter.clone())
        .map(|hub: SnapshotHub| warp::reply::json(&hub.latest()));

    let ws_route = warp::path("ws")
        .and(warp::ws())
        .and(hub_filter)
        .map(|ws: warp::ws::Ws, hub: SnapshotHub| {
            ws.on_upgrade(move |socket| handle_connection(socket, hub))
        });

    snapshot_route.or(ws_route)
}

pub async fn start_server(
    hub: SnapshotHub,
    port: u16,
    mut shutdown_signal: broadcast::Receiver<()>,
) {
    log_info(&format!("Snapshot feed on http://127.0.0.1:{}/snapshot", port));
    let server = warp::serve(routes(hub)).run(([127, 0, 0, 1], port));

    tokio::select! {
        _ = server => {},
        _ = shutdown_signal.recv() => {
            log_info("Shutting down snapshot server...");
        }
    }
}

async fn handle_connection(ws: warp::ws::WebSocket, hub: SnapshotHub) {
    let (mut sender, mut receiver) = ws.split();
    let mut updates = BroadcastStream::new(hub.subscribe());

    if let Ok(initial) = serde_json::to_string(&hub.latest()) {
        if sender.send(warp::ws::Message::text(initial)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(Ok(snapshot)) => {
                    let text = match serde_json::to_string(&snapshot) {
                        Ok(text) => text,
                        Err(e) => {
                            log_warning(&format!("Could not encode snapshot: {}", e));
                            continue;
                        }
                    };
                    if sender.send(warp::ws::Message::text(text)).await.is_err() {
                        break;
                    }
                }
                // Lagged subscriber: skip ahead to the next snapshot.
                Some(Err(_)) => continue,
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::DashboardConfig;

    #[test]
    fn snapshot_carries_ranked_targets() {
        let diagnostics = Diagnostics::new(DashboardConfig::default());
        let snapshot = DashboardSnapshot::capture(&diagnostics, Some("pHReal"));
        assert_eq!(snapshot.evidence["T_sensor"], "normal");
        assert_eq!(snapshot.ranked.len(), 2);
        assert_eq!(snapshot.selected_node.as_deref(), Some("pHReal"));
        assert!(snapshot.updated_at.is_none());
    }

    #[tokio::test]
    async fn hub_fans_out_and_remembers() {
        let hub = SnapshotHub::new();
        let mut rx = hub.subscribe();
        let diagnostics = Diagnostics::new(DashboardConfig::default());
        hub.publish(DashboardSnapshot::capture(&diagnostics, None));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.evidence, hub.latest().evidence);
    }

    #[tokio::test]
    async fn snapshot_route_serves_json() {
        let hub = SnapshotHub::new();
        let diagnostics = Diagnostics::new(DashboardConfig::default());
        hub.publish(DashboardSnapshot::capture(&diagnostics, None));

        let response = warp::test::request()
            .method("GET")
            .path("/snapshot")
            .reply(&routes(hub))
            .await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["evidence"]["pH_sensor"], "neutro");
    }
}
