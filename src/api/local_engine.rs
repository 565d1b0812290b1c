// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::api::engine_client::BayesEngine;
use crate::api::network::BayesNetwork;
use crate::error::EngineError;
use crate::models::constants::SAMPLING_SEED;
use crate::models::types::{Distribution, EvidenceAssignment, GraphStructure, NodeGroup};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InferenceMode {
    Exact,
    Sampling { samples: usize, seed: u64 },
}

impl InferenceMode {
    pub fn sampling(samples: usize) -> Self {
        InferenceMode::Sampling {
            samples,
            seed: SAMPLING_SEED,
        }
    }
}

/// Engine running in-process against a network held in memory.
pub struct LocalEngine {
    id: Uuid,
    network: BayesNetwork,
    mode: InferenceMode,
}

impl LocalEngine {
    pub fn new(network: BayesNetwork, mode: InferenceMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            network,
            mode,
        }
    }

    pub fn biodigester(mode: InferenceMode) -> Result<Self, EngineError> {
        Ok(Self::new(build_biodigester_network()?, mode))
    }

    fn resolve_evidence(&self, evidence: &EvidenceAssignment) -> Result<HashMap<usize, usize>, EngineError> {
        evidence
            .iter()
            .map(|(node, state)| {
                let id = self.network.id_of(node)?;
                Ok((id, self.network.state_index(id, state)?))
            })
            .collect()
    }
}

#[async_trait]
impl BayesEngine for LocalEngine {
    fn instance_id(&self) -> Uuid {
        self.id
    }

    async fn infer(
        &self,
        evidence: &EvidenceAssignment,
        target: &str,
    ) -> Result<Distribution, EngineError> {
        let evidence = self.resolve_evidence(evidence)?;
        let target_id = self.network.id_of(target)?;

        let posterior = match self.mode {
            InferenceMode::Exact => self.network.enumerate(&evidence, target_id)?,
            InferenceMode::Sampling { samples, seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                self.network.rejection_sampling(&evidence, target_id, samples, &mut rng)?
            }
        };

        Ok(self
            .network
            .node(target_id)
            .states
            .iter()
            .cloned()
            .zip(posterior)
            .collect())
    }

    async fn graph_structure(&self) -> Result<GraphStructure, EngineError> {
        Ok(self.network.structure())
    }

    async fn node_cpt(&self, node_id: &str) -> Result<Option<Value>, EngineError> {
        let id = self.network.id_of(node_id)?;
        Ok(Some(self.network.cpt_value(id)))
    }
}

/// Anaerobic biodigester: two hidden health states, the physical quantities
/// they drive and the noisy sensors that observe them.
pub fn build_biodigester_network() -> Result<BayesNetwork, EngineError> {
    let mut bn = BayesNetwork::new();

    // Roots
    bn.add_discrete_node(
        "EstadoMicrobiano",
        NodeGroup::Hidden,
        &[],
        &["Bueno", "Degradado"],
        &[(&[], &[("Bueno", 0.85), ("Degradado", 0.15)])],
    )?;
    bn.add_discrete_node(
        "EstadoOperativo",
        NodeGroup::Hidden,
        &[],
        &["Normal", "FallaMecanica", "Fuga"],
        &[(&[], &[("Normal", 0.95), ("FallaMecanica", 0.03), ("Fuga", 0.02)])],
    )?;

    // Physical quantities
    bn.add_discrete_node(
        "TemperaturaReal",
        NodeGroup::Physical,
        &["EstadoMicrobiano"],
        &["Baja", "Normal", "Alta"],
        &[
            (&["Bueno"], &[("Normal", 0.9), ("Baja", 0.05), ("Alta", 0.05)]),
            (&["Degradado"], &[("Baja", 0.6), ("Normal", 0.3), ("Alta", 0.1)]),
        ],
    )?;
    bn.add_discrete_node(
        "pHReal",
        NodeGroup::Physical,
        &["EstadoMicrobiano"],
        &["Acido", "Neutro", "Alcalino"],
        &[
            (&["Bueno"], &[("Neutro", 0.85), ("Acido", 0.1), ("Alcalino", 0.05)]),
            (&["Degradado"], &[("Acido", 0.6), ("Neutro", 0.3), ("Alcalino", 0.1)]),
        ],
    )?;
    bn.add_discrete_node(
        "CaudalReal",
        NodeGroup::Physical,
        &["EstadoOperativo"],
        &["Bajo", "Normal", "Alto"],
        &[
            (&["Normal"], &[("Normal", 0.9), ("Bajo", 0.05), ("Alto", 0.05)]),
            (&["Fuga"], &[("Alto", 0.7), ("Normal", 0.2), ("Bajo", 0.1)]),
            (&["FallaMecanica"], &[("Bajo", 0.8), ("Normal", 0.15), ("Alto", 0.05)]),
        ],
    )?;
    bn.add_discrete_node(
        "PresionReal",
        NodeGroup::Physical,
        &["EstadoOperativo"],
        &["Baja", "Normal", "Alta"],
        &[
            (&["Normal"], &[("Normal", 0.9), ("Baja", 0.05), ("Alta", 0.05)]),
            (&["Fuga"], &[("Baja", 0.6), ("Normal", 0.3), ("Alta", 0.1)]),
            (&["FallaMecanica"], &[("Alta", 0.7), ("Normal", 0.2), ("Baja", 0.1)]),
        ],
    )?;
    bn.add_discrete_node(
        "ProduccionGasReal",
        NodeGroup::Physical,
        &["EstadoMicrobiano", "CaudalReal"],
        &["Baja", "Normal", "Alta"],
        &[
            (&["Bueno", "Normal"], &[("Normal", 0.85), ("Alta", 0.10), ("Baja", 0.05)]),
            (&["Bueno", "Bajo"], &[("Normal", 0.5), ("Alta", 0.1), ("Baja", 0.4)]),
            (&["Degradado", "Normal"], &[("Normal", 0.2), ("Alta", 0.1), ("Baja", 0.7)]),
            (&["Degradado", "Bajo"], &[("Normal", 0.09), ("Alta", 0.01), ("Baja", 0.9)]),
            (&["Bueno", "Alto"], &[("Normal", 0.7), ("Alta", 0.25), ("Baja", 0.05)]),
            (&["Degradado", "Alto"], &[("Normal", 0.1), ("Alta", 0.2), ("Baja", 0.7)]),
        ],
    )?;

    // Sensors
    bn.add_discrete_node(
        "T_sensor",
        NodeGroup::Sensor,
        &["TemperaturaReal"],
        &["baja", "normal", "alta"],
        &[
            (&["Alta"], &[("alta", 0.92), ("normal", 0.07), ("baja", 0.01)]),
            (&["Normal"], &[("normal", 0.9), ("baja", 0.05), ("alta", 0.05)]),
            (&["Baja"], &[("baja", 0.95), ("normal", 0.04), ("alta", 0.01)]),
        ],
    )?;
    bn.add_discrete_node(
        "pH_sensor",
        NodeGroup::Sensor,
        &["pHReal"],
        &["acido", "neutro", "alcalino"],
        &[
            (&["Neutro"], &[("neutro", 0.9), ("acido", 0.05), ("alcalino", 0.05)]),
            (&["Acido"], &[("acido", 0.9), ("neutro", 0.05), ("alcalino", 0.05)]),
            (&["Alcalino"], &[("alcalino", 0.9), ("neutro", 0.05), ("acido", 0.05)]),
        ],
    )?;
    bn.add_discrete_node(
        "Flow_sensor",
        NodeGroup::Sensor,
        &["CaudalReal"],
        &["bajo", "normal", "alto"],
        &[
            (&["Bajo"], &[("bajo", 0.95), ("normal", 0.04), ("alto", 0.01)]),
            (&["Normal"], &[("normal", 0.9), ("bajo", 0.05), ("alto", 0.05)]),
            (&["Alto"], &[("alto", 0.92), ("normal", 0.06), ("bajo", 0.02)]),
        ],
    )?;
    bn.add_discrete_node(
        "Gas_sensor",
        NodeGroup::Sensor,
        &["ProduccionGasReal"],
        &["bajo", "normal", "alto"],
        &[
            (&["Baja"], &[("bajo", 0.95), ("normal", 0.04), ("alto", 0.01)]),
            (&["Normal"], &[("normal", 0.9), ("bajo", 0.05), ("alto", 0.05)]),
            (&["Alta"], &[("alto", 0.92), ("normal", 0.06), ("bajo", 0.02)]),
        ],
    )?;
    bn.add_discrete_node(
        "Presion_sensor",
        NodeGroup::Sensor,
        &["PresionReal"],
        &["baja", "normal", "alta"],
        &[
            (&["Alta"], &[("alta", 0.92), ("normal", 0.06), ("baja", 0.02)]),
            (&["Normal"], &[("normal", 0.9), ("baja", 0.05), ("alta", 0.05)]),
            (&["Baja"], &[("baja", 0.95), ("normal", 0.04), ("alta", 0.01)]),
        ],
    )?;

    Ok(bn)
}
