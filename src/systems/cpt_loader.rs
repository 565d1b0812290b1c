use crate::api::engine_client::BayesEngine;
use crate::models::types::Node;
use crate::systems::cpt::{normalize, NormalizedCpt};
use crate::utils::logging::log_warning;
use futures::future::join_all;
use std::collections::HashMap;

/// What the popup can show for a node.
#[derive(Clone, Debug, PartialEq)]
pub enum CptEntry {
    Table(NormalizedCpt),
    /// The fetch failed or the engine has no table for the node.
    Unavailable,
    UnknownFormat(String),
}

impl CptEntry {
    pub fn table(&self) -> Option<&NormalizedCpt> {
        match self {
            CptEntry::Table(cpt) => Some(cpt),
            _ => None,
        }
    }
}

pub type CptMap = HashMap<String, CptEntry>;

/// Fetches every node's table concurrently. A failing node is stored as
/// unavailable; the batch itself never fails.
pub async fn load_all(engine: &dyn BayesEngine, nodes: &[Node]) -> CptMap {
    let fetches = nodes.iter().map(|node| async move {
        let entry = match engine.node_cpt(&node.id).await {
            Ok(Some(raw)) => match normalize(&raw) {
                Ok(cpt) => CptEntry::Table(cpt),
                Err(e) => {
                    log_warning(&format!("CPT of {}: {}", node.id, e));
                    CptEntry::UnknownFormat(e.to_string())
                }
            },
            Ok(None) => CptEntry::Unavailable,
            Err(e) => {
                log_warning(&format!("Could not fetch CPT of {}: {}", node.id, e));
                CptEntry::Unavailable
            }
        };
        (node.id.clone(), entry)
    });

    join_all(fetches).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::types::{Distribution, EvidenceAssignment, GraphStructure, NodeGroup};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use uuid::Uuid;

    struct PatchyEngine;

    #[async_trait]
    impl BayesEngine for PatchyEngine {
        fn instance_id(&self) -> Uuid {
            Uuid::nil()
        }

        async fn infer(&self, _: &EvidenceAssignment, _: &str) -> Result<Distribution, EngineError> {
            Ok(Distribution::new())
        }

        async fn graph_structure(&self) -> Result<GraphStructure, EngineError> {
            Ok(GraphStructure::default())
        }

        async fn node_cpt(&self, node_id: &str) -> Result<Option<Value>, EngineError> {
            match node_id {
                "root" => Ok(Some(json!({"Discrete": {"node_possible_values": ["a", "b"], "table": []}}))),
                "flat" => Ok(Some(json!({"Discrete": {"table": {"[]": {"a": 0.4, "b": 0.6}}}}))),
                "odd" => Ok(Some(json!({"Gaussian": {}}))),
                "missing" => Ok(None),
                _ => Err(EngineError::Unavailable("timeout".into())),
            }
        }
    }

    fn node(id: &str) -> Node {
        Node::new(id, id, NodeGroup::Physical)
    }

    #[tokio::test]
    async fn one_failure_does_not_sink_the_batch() {
        let nodes: Vec<Node> = ["root", "flat", "odd", "missing", "broken"].iter().map(|id| node(id)).collect();
        let map = load_all(&PatchyEngine, &nodes).await;

        assert_eq!(map.len(), 5);
        assert!(map["root"].table().map_or(false, NormalizedCpt::is_root));
        assert!(matches!(map["flat"], CptEntry::Table(NormalizedCpt::Discrete(_))));
        assert!(matches!(map["odd"], CptEntry::UnknownFormat(_)));
        assert_eq!(map["missing"], CptEntry::Unavailable);
        assert_eq!(map["broken"], CptEntry::Unavailable);
    }
}
