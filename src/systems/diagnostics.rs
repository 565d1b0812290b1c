// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::api::engine_client::BayesEngine;
use crate::error::DashboardError;
use crate::models::config::DashboardConfig;
use crate::models::types::{Distribution, EvidenceAssignment, InferenceResult};
use crate::utils::logging::log_warning;
use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    pub evidence: EvidenceAssignment,
    pub targets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InferenceOutcome {
    pub evidence: EvidenceAssignment,
    pub results: InferenceResult,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateTone {
    Critical,
    Nominal,
    Neutral,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedState {
    pub label: String,
    pub probability: f64,
    pub tone: StateTone,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlertHit {
    pub target: String,
    pub state: String,
    pub probability: f64,
}

pub struct Diagnostics {
    config: DashboardConfig,
    evidence: EvidenceAssignment,
    results: InferenceResult,
    updated_at: Option<DateTime<Local>>,
}

impl Diagnostics {
    pub fn new(config: DashboardConfig) -> Self {
        let evidence = config.default_evidence();
        Self {
            config,
            evidence,
            results: InferenceResult::new(),
            updated_at: None,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn evidence(&self) -> &EvidenceAssignment {
        &self.evidence
    }

    pub fn results(&self) -> &InferenceResult {
        &self.results
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    /// A request for the evidence as it stands now.
    pub fn request(&self) -> InferenceRequest {
        InferenceRequest {
            evidence: self.evidence.clone(),
            targets: self.config.targets.iter().map(|t| t.id.clone()).collect(),
        }
    }

    pub fn set_evidence(&mut self, sensor: &str, value: &str) -> Result<InferenceRequest, DashboardError> {
        let spec = self
            .config
            .sensor(sensor)
            .ok_or_else(|| DashboardError::UnknownSensor(sensor.to_string()))?;
        if !spec.options.iter().any(|o| o == value) {
            return Err(DashboardError::InvalidOption {
                sensor: sensor.to_string(),
                value: value.to_string(),
            });
        }

        self.evidence.insert(sensor.to_string(), value.to_string());
        Ok(self.request())
    }

    /// Moves the sensor at `index` by `step` options, wrapping around.
    pub fn cycle_sensor(&mut self, index: usize, step: isize) -> Option<InferenceRequest> {
        let spec = self.config.sensors.get(index)?;
        if spec.options.is_empty() {
            return None;
        }
        let count = spec.options.len() as isize;
        let current = self
            .evidence
            .get(&spec.id)
            .and_then(|v| spec.options.iter().position(|o| o == v))
            .unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(count) as usize;

        let (id, value) = (spec.id.clone(), spec.options[next].clone());
        self.set_evidence(&id, &value).ok()
    }

    /// Replaces the results if the outcome was computed for the current
    /// evidence. Returns whether it was applied.
    pub fn apply(&mut self, outcome: InferenceOutcome) -> bool {
        if outcome.evidence != self.evidence {
            return false;
        }
        self.results = outcome.results;
        self.updated_at = Some(Local::now());
        true
    }

    pub fn tone(&self, label: &str) -> StateTone {
        if self.config.is_critical(label) {
            StateTone::Critical
        } else if self.config.is_nominal(label) {
            StateTone::Nominal
        } else {
            StateTone::Neutral
        }
    }

    /// States of a target by descending probability. Empty means no data.
    pub fn ranked(&self, target: &str) -> Vec<RankedState> {
        let mut states: Vec<RankedState> = self
            .results
            .get(target)
            .map(|dist| {
                dist.iter()
                    .map(|(label, &probability)| RankedState {
                        label: label.clone(),
                        probability,
                        tone: self.tone(label),
                    })
                    .collect()
            })
            .unwrap_or_default();
        states.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        states
    }

    pub fn alerts(&self) -> Vec<AlertHit> {
        let config = &self.config;
        self.results
            .iter()
            .flat_map(move |(target, dist)| {
                dist.iter()
                    .filter(move |(state, p)| config.is_critical(state) && **p > config.alert_threshold)
                    .map(move |(state, &probability)| AlertHit {
                        target: target.clone(),
                        state: state.clone(),
                        probability,
                    })
            })
            .collect()
    }

    pub fn has_alert(&self) -> bool {
        !self.alerts().is_empty()
    }
}

/// Runs one inference per target concurrently. A failing target comes back
/// as an empty distribution.
pub async fn run_inference(engine: &dyn BayesEngine, request: InferenceRequest) -> InferenceOutcome {
    let InferenceRequest { evidence, targets } = request;

    let passes = targets.iter().map(|target| {
        let evidence = &evidence;
        async move {
            let dist = engine.infer(evidence, target).await.unwrap_or_else(|e| {
                log_warning(&format!("Inference for {} failed: {}", target, e));
                Distribution::new()
            });
            (target.clone(), dist)
        }
    });
    let results = join_all(passes).await.into_iter().collect();

    InferenceOutcome { evidence, results }
}

/// Parses a `SENSOR=VALUE` argument.
pub fn parse_assignment(arg: &str) -> Result<(String, String), DashboardError> {
    match arg.split_once('=') {
        Some((sensor, value)) if !sensor.trim().is_empty() && !value.trim().is_empty() => {
            Ok((sensor.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(DashboardError::MalformedEvidence(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::types::GraphStructure;
    use async_trait::async_trait;
    use serde_json::Value;
    use uuid::Uuid;

    struct FaultyPump;

    #[async_trait]
    impl BayesEngine for FaultyPump {
        fn instance_id(&self) -> Uuid {
            Uuid::nil()
        }

        async fn infer(&self, _: &EvidenceAssignment, target: &str) -> Result<Distribution, EngineError> {
            match target {
                "EstadoOperativo" => Ok(Distribution::from([
                    ("FallaMecanica".to_string(), 0.72),
                    ("Normal".to_string(), 0.28),
                ])),
                _ => Err(EngineError::Unavailable("microbial model offline".into())),
            }
        }

        async fn graph_structure(&self) -> Result<GraphStructure, EngineError> {
            Ok(GraphStructure::default())
        }

        async fn node_cpt(&self, _: &str) -> Result<Option<Value>, EngineError> {
            Ok(None)
        }
    }

    fn mechanical_fault_evidence(diagnostics: &mut Diagnostics) -> InferenceRequest {
        for (sensor, value) in [
            ("T_sensor", "alta"),
            ("pH_sensor", "acido"),
            ("Gas_sensor", "alto"),
            ("Flow_sensor", "normal"),
        ] {
            diagnostics.set_evidence(sensor, value).unwrap();
        }
        diagnostics.set_evidence("Presion_sensor", "normal").unwrap()
    }

    #[tokio::test]
    async fn mechanical_fault_raises_alert() {
        let mut diagnostics = Diagnostics::new(DashboardConfig::default());
        let request = mechanical_fault_evidence(&mut diagnostics);

        let outcome = run_inference(&FaultyPump, request).await;
        assert!(diagnostics.apply(outcome));

        let alerts = diagnostics.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].state, "FallaMecanica");
        assert!(diagnostics.has_alert());

        let ranked = diagnostics.ranked("EstadoOperativo");
        assert_eq!(ranked[0].label, "FallaMecanica");
        assert_eq!(ranked[0].tone, StateTone::Critical);
        assert_eq!(ranked[1].tone, StateTone::Nominal);
    }

    #[tokio::test]
    async fn failed_target_fails_closed() {
        let mut diagnostics = Diagnostics::new(DashboardConfig::default());
        let outcome = run_inference(&FaultyPump, diagnostics.request()).await;
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results["EstadoMicrobiano"].is_empty());

        diagnostics.apply(outcome);
        assert!(diagnostics.ranked("EstadoMicrobiano").is_empty());
        assert!(diagnostics.updated_at().is_some());
    }

    #[tokio::test]
    async fn stale_outcomes_are_discarded() {
        let mut diagnostics = Diagnostics::new(DashboardConfig::default());
        let stale = diagnostics.set_evidence("T_sensor", "alta").unwrap();
        let fresh = diagnostics.set_evidence("T_sensor", "baja").unwrap();

        let late = run_inference(&FaultyPump, stale).await;
        assert!(!diagnostics.apply(late));
        assert!(diagnostics.results().is_empty());

        let current = run_inference(&FaultyPump, fresh).await;
        assert!(diagnostics.apply(current));
    }

    #[test]
    fn threshold_is_strict() {
        let mut diagnostics = Diagnostics::new(DashboardConfig::default());
        let outcome = InferenceOutcome {
            evidence: diagnostics.evidence().clone(),
            results: InferenceResult::from([(
                "EstadoMicrobiano".to_string(),
                Distribution::from([("Degradado".to_string(), 0.6), ("Bueno".to_string(), 0.4)]),
            )]),
        };
        diagnostics.apply(outcome);
        assert!(!diagnostics.has_alert());
    }

    #[test]
    fn evidence_is_validated_and_cycles() {
        let mut diagnostics = Diagnostics::new(DashboardConfig::default());
        assert!(matches!(
            diagnostics.set_evidence("Humedad_sensor", "alta"),
            Err(DashboardError::UnknownSensor(_))
        ));
        assert!(matches!(
            diagnostics.set_evidence("T_sensor", "tibia"),
            Err(DashboardError::InvalidOption { .. })
        ));

        let index = diagnostics
            .config()
            .sensors
            .iter()
            .position(|s| s.id == "T_sensor")
            .unwrap();
        diagnostics.cycle_sensor(index, 1);
        assert_eq!(diagnostics.evidence()["T_sensor"], "alta");
        diagnostics.cycle_sensor(index, 1);
        assert_eq!(diagnostics.evidence()["T_sensor"], "baja");
        diagnostics.cycle_sensor(index, -1);
        assert_eq!(diagnostics.evidence()["T_sensor"], "alta");
    }

    #[test]
    fn cycling_a_sensor_without_options_is_a_no_op() {
        let mut config = DashboardConfig::default();
        config.sensors[0].options.clear();
        let sensor = config.sensors[0].id.clone();
        let mut diagnostics = Diagnostics::new(config);
        let before = diagnostics.evidence()[&sensor].clone();

        assert!(diagnostics.cycle_sensor(0, 1).is_none());
        assert!(diagnostics.cycle_sensor(0, -1).is_none());
        assert_eq!(diagnostics.evidence()[&sensor], before);
    }

    #[test]
    fn assignments_parse() {
        assert_eq!(
            parse_assignment("pH_sensor=acido").unwrap(),
            ("pH_sensor".to_string(), "acido".to_string())
        );
        assert!(parse_assignment("pH_sensor").is_err());
        assert!(parse_assignment("=acido").is_err());
    }
}
