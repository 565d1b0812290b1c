// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::error::EngineError;
use crate::models::types::{Edge, GraphStructure, Node, NodeGroup};
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct NetworkNode {
    pub name: String,
    pub group: NodeGroup,
    pub parents: Vec<usize>,
    pub states: Vec<String>,
    // Parent state indices -> probability per own state, in insertion order
    rows: Vec<(Vec<usize>, Vec<f64>)>,
    lookup: HashMap<Vec<usize>, usize>,
}

impl NetworkNode {
    fn conditional(&self, assignment: &[usize]) -> Option<&[f64]> {
        let key: Vec<usize> = self.parents.iter().map(|&p| assignment[p]).collect();
        self.lookup.get(&key).map(|&row| self.rows[row].1.as_slice())
    }
}

/// Discrete Bayesian network. Nodes must be added parents-first, so
/// insertion order is always a topological order.
#[derive(Clone, Debug, Default)]
pub struct BayesNetwork {
    nodes: Vec<NetworkNode>,
    index: HashMap<String, usize>,
}

impl BayesNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_discrete_node(
        &mut self,
        name: &str,
        group: NodeGroup,
        parents: &[&str],
        states: &[&str],
        table: &[(&[&str], &[(&str, f64)])],
    ) -> Result<usize, EngineError> {
        let parent_ids = parents
            .iter()
            .map(|p| self.id_of(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(table.len());
        let mut lookup = HashMap::new();
        for (config, dist) in table {
            if config.len() != parent_ids.len() {
                return Err(EngineError::Unavailable(format!(
                    "row of {} has {} parent values, expected {}",
                    name,
                    config.len(),
                    parent_ids.len()
                )));
            }
            let key = config
                .iter()
                .zip(&parent_ids)
                .map(|(label, &p)| self.state_index(p, label))
                .collect::<Result<Vec<_>, _>>()?;

            let mut probs = vec![0.0; states.len()];
            for (state, p) in dist.iter() {
                let pos = states.iter().position(|s| s == state).ok_or_else(|| {
                    EngineError::UnknownState {
                        node: name.to_string(),
                        state: state.to_string(),
                    }
                })?;
                probs[pos] = *p;
            }

            lookup.insert(key.clone(), rows.len());
            rows.push((key, probs));
        }

        let id = self.nodes.len();
        self.nodes.push(NetworkNode {
            name: name.to_string(),
            group,
            parents: parent_ids,
            states: states.iter().map(|s| s.to_string()).collect(),
            rows,
            lookup,
        });
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Result<usize, EngineError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::NodeNotFound(name.to_string()))
    }

    pub fn node(&self, id: usize) -> &NetworkNode {
        &self.nodes[id]
    }

    pub fn state_index(&self, node: usize, label: &str) -> Result<usize, EngineError> {
        let node = &self.nodes[node];
        node.states
            .iter()
            .position(|s| s == label)
            .ok_or_else(|| EngineError::UnknownState {
                node: node.name.clone(),
                state: label.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Exact posterior of `target` by enumerating every joint assignment
    /// consistent with the evidence.
    pub fn enumerate(&self, evidence: &HashMap<usize, usize>, target: usize) -> Result<Vec<f64>, EngineError> {
        let mut acc = vec![0.0; self.nodes[target].states.len()];
        let mut assignment = vec![0usize; self.nodes.len()];
        self.enumerate_from(0, &mut assignment, evidence, target, 1.0, &mut acc);
        normalize_weights(acc)
    }

    fn enumerate_from(
        &self,
        idx: usize,
        assignment: &mut Vec<usize>,
        evidence: &HashMap<usize, usize>,
        target: usize,
        weight: f64,
        acc: &mut [f64],
    ) {
        if weight == 0.0 {
            return;
        }
        if idx == self.nodes.len() {
            acc[assignment[target]] += weight;
            return;
        }

        let probs = match self.nodes[idx].conditional(assignment) {
            Some(probs) => probs,
            None => return,
        };

        match evidence.get(&idx) {
            Some(&observed) => {
                assignment[idx] = observed;
                self.enumerate_from(idx + 1, assignment, evidence, target, weight * probs[observed], acc);
            }
            None => {
                for (state, p) in probs.iter().enumerate() {
                    assignment[idx] = state;
                    self.enumerate_from(idx + 1, assignment, evidence, target, weight * p, acc);
                }
            }
        }
    }

    /// Approximate posterior by forward sampling, rejecting samples that
    /// disagree with the evidence.
    pub fn rejection_sampling<R: Rng>(
        &self,
        evidence: &HashMap<usize, usize>,
        target: usize,
        samples: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>, EngineError> {
        let mut counts = vec![0.0; self.nodes[target].states.len()];
        let mut assignment = vec![0usize; self.nodes.len()];

        'sample: for _ in 0..samples {
            for (idx, node) in self.nodes.iter().enumerate() {
                let probs = match node.conditional(&assignment) {
                    Some(probs) => probs,
                    None => continue 'sample,
                };
                let state = draw(probs, rng);
                if evidence.get(&idx).map_or(false, |&observed| observed != state) {
                    continue 'sample;
                }
                assignment[idx] = state;
            }
            counts[assignment[target]] += 1.0;
        }

        normalize_weights(counts)
    }

    pub fn structure(&self) -> GraphStructure {
        let nodes = self
            .nodes
            .iter()
            .map(|n| Node::new(&n.name, &n.name, n.group))
            .collect();
        let edges = self
            .nodes
            .iter()
            .flat_map(|child| {
                child.parents.iter().map(move |&p| Edge {
                    from: self.nodes[p].name.clone(),
                    to: child.name.clone(),
                })
            })
            .collect();
        GraphStructure { nodes, edges }
    }

    /// The node's table in the engine wire encoding: map entries whose keys
    /// are sequences of labeled values.
    pub fn cpt_value(&self, id: usize) -> Value {
        let node = &self.nodes[id];
        let labeled = |s: &str| json!({ "Value": s });

        let table: Vec<Value> = node
            .rows
            .iter()
            .map(|(config, probs)| {
                let key: Vec<Value> = config
                    .iter()
                    .zip(&node.parents)
                    .map(|(&state, &parent)| labeled(&self.nodes[parent].states[state]))
                    .collect();
                let dist: Vec<Value> = node
                    .states
                    .iter()
                    .zip(probs)
                    .map(|(state, p)| json!([labeled(state), p]))
                    .collect();
                json!([key, dist])
            })
            .collect();

        json!({
            "Discrete": {
                "node_possible_values": node.states.iter().map(|s| labeled(s)).collect::<Vec<_>>(),
                "table": table
            }
        })
    }
}

fn draw<R: Rng>(probs: &[f64], rng: &mut R) -> usize {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (state, p) in probs.iter().enumerate() {
        cumulative += p;
        if roll < cumulative {
            return state;
        }
    }
    probs.len().saturating_sub(1)
}

fn normalize_weights(weights: Vec<f64>) -> Result<Vec<f64>, EngineError> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(EngineError::ImpossibleEvidence);
    }
    Ok(weights.into_iter().map(|w| w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sprinkler() -> BayesNetwork {
        let mut bn = BayesNetwork::new();
        bn.add_discrete_node("Rain", NodeGroup::Hidden, &[], &["yes", "no"], &[(&[], &[("yes", 0.2), ("no", 0.8)])])
            .unwrap();
        bn.add_discrete_node(
            "Grass",
            NodeGroup::Sensor,
            &["Rain"],
            &["wet", "dry"],
            &[
                (&["yes"], &[("wet", 0.9), ("dry", 0.1)]),
                (&["no"], &[("wet", 0.2), ("dry", 0.8)]),
            ],
        )
        .unwrap();
        bn
    }

    #[test]
    fn exact_posterior_matches_bayes_rule() {
        let bn = sprinkler();
        let rain = bn.id_of("Rain").unwrap();
        let grass = bn.id_of("Grass").unwrap();
        let evidence = HashMap::from([(grass, 0)]);

        let posterior = bn.enumerate(&evidence, rain).unwrap();
        let expected = 0.18 / (0.18 + 0.16);
        assert!((posterior[0] - expected).abs() < 1e-12);
        assert!((posterior.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sampling_approaches_exact_answer() {
        let bn = sprinkler();
        let rain = bn.id_of("Rain").unwrap();
        let evidence = HashMap::from([(bn.id_of("Grass").unwrap(), 0)]);
        let mut rng = StdRng::seed_from_u64(7);

        let posterior = bn.rejection_sampling(&evidence, rain, 20_000, &mut rng).unwrap();
        assert!((posterior[0] - 0.18 / 0.34).abs() < 0.03);
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut bn = sprinkler();
        assert!(matches!(bn.id_of("Snow"), Err(EngineError::NodeNotFound(_))));
        assert!(matches!(bn.state_index(0, "maybe"), Err(EngineError::UnknownState { .. })));
        let bad = bn.add_discrete_node("Mud", NodeGroup::Physical, &["Snow"], &["yes"], &[]);
        assert!(bad.is_err());
    }

    #[test]
    fn zero_weight_evidence_is_impossible() {
        let mut bn = BayesNetwork::new();
        bn.add_discrete_node("A", NodeGroup::Hidden, &[], &["on", "off"], &[(&[], &[("on", 1.0)])])
            .unwrap();
        let evidence = HashMap::from([(0, 1)]);
        assert!(matches!(bn.enumerate(&evidence, 0), Err(EngineError::ImpossibleEvidence)));
    }

    #[test]
    fn structure_lists_parent_edges() {
        let structure = sprinkler().structure();
        assert_eq!(structure.nodes.len(), 2);
        assert_eq!(structure.edges, vec![Edge { from: "Rain".into(), to: "Grass".into() }]);
    }
}
