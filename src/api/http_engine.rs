use crate::api::engine_client::BayesEngine;
use crate::error::EngineError;
use crate::models::constants::ENGINE_TIMEOUT_SECS;
use crate::models::types::{Distribution, EvidenceAssignment, GraphStructure};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    id: Uuid,
}

impl HttpEngine {
    pub fn new(base_url: &str) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ENGINE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            id: Uuid::new_v4(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode(response: reqwest::Response) -> Result<Value, EngineError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::Unavailable(format!("{}: {}", status, body.trim())));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BayesEngine for HttpEngine {
    fn instance_id(&self) -> Uuid {
        self.id
    }

    async fn infer(
        &self,
        evidence: &EvidenceAssignment,
        target: &str,
    ) -> Result<Distribution, EngineError> {
        let response = self
            .client
            .post(&self.endpoint("infer"))
            .json(&json!({
                "evidence": evidence,
                "target": target
            }))
            .send()
            .await?;

        let parsed = Self::decode(response).await?;
        Ok(serde_json::from_value(parsed)?)
    }

    async fn graph_structure(&self) -> Result<GraphStructure, EngineError> {
        let response = self.client.get(&self.endpoint("graph")).send().await?;
        let parsed = Self::decode(response).await?;
        Ok(serde_json::from_value(parsed)?)
    }

    async fn node_cpt(&self, node_id: &str) -> Result<Option<Value>, EngineError> {
        let response = self
            .client
            .get(&self.endpoint(&format!("cpt/{}", node_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        match Self::decode(response).await? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::http::StatusCode as WarpStatus;
    use warp::Filter;

    fn stub_engine() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let root = warp::path!("cpt" / "EstadoMicrobiano").map(|| warp::reply::json(&Value::Null));
        let table = warp::path!("cpt" / "pHReal").map(|| {
            warp::reply::json(&json!({"Discrete": {
                "node_possible_values": ["Acido", "Neutro", "Alcalino"],
                "table": {"[{\"Value\":\"Bueno\"}]": {"Acido": 0.1, "Neutro": 0.8, "Alcalino": 0.1}}
            }}))
        });
        let broken = warp::path!("cpt" / "CaudalReal")
            .map(|| warp::reply::with_status("engine crashed", WarpStatus::INTERNAL_SERVER_ERROR));
        root.or(table).or(broken)
    }

    async fn serve_stub() -> HttpEngine {
        let (addr, server) = warp::serve(stub_engine()).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        HttpEngine::new(&format!("http://{}", addr)).unwrap()
    }

    #[tokio::test]
    async fn missing_and_null_tables_are_absent() {
        let engine = serve_stub().await;
        assert!(engine.node_cpt("Humedad").await.unwrap().is_none());
        assert!(engine.node_cpt("EstadoMicrobiano").await.unwrap().is_none());

        let table = engine.node_cpt("pHReal").await.unwrap().unwrap();
        assert_eq!(table["Discrete"]["node_possible_values"][1], "Neutro");
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let engine = serve_stub().await;
        let result = engine.node_cpt("CaudalReal").await;
        assert!(matches!(result, Err(EngineError::Unavailable(msg)) if msg.contains("engine crashed")));
    }

    #[test]
    fn base_url_is_trimmed() {
        let engine = HttpEngine::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(engine.base_url(), "http://127.0.0.1:8000");
        assert_eq!(engine.endpoint("cpt/pHReal"), "http://127.0.0.1:8000/cpt/pHReal");
    }

    #[tokio::test]
    async fn unreachable_engine_is_an_error() {
        let engine = HttpEngine::new("http://127.0.0.1:9").unwrap();
        let result = engine.infer(&EvidenceAssignment::new(), "EstadoOperativo").await;
        assert!(result.is_err());
    }
}
