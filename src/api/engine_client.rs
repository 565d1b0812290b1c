use crate::error::EngineError;
use crate::models::types::{Distribution, EvidenceAssignment, GraphStructure};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// The probabilistic engine behind the dashboard.
///
/// Structure, tables and inference all live on the other side of this trait;
/// the dashboard only normalizes and displays what comes back.
#[async_trait]
pub trait BayesEngine: Send + Sync {
    /// Changes whenever the underlying network is replaced. Callers re-fetch
    /// the graph structure only when this changes.
    fn instance_id(&self) -> Uuid;

    async fn infer(
        &self,
        evidence: &EvidenceAssignment,
        target: &str,
    ) -> Result<Distribution, EngineError>;

    async fn graph_structure(&self) -> Result<GraphStructure, EngineError>;

    /// Raw CPT payload for a node, in whichever encoding the engine uses.
    /// `Ok(None)` means the engine has no table for it.
    async fn node_cpt(&self, node_id: &str) -> Result<Option<Value>, EngineError>;
}
