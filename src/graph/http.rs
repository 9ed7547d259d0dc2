use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::GraphRecorder;
use crate::error::{GraphError, GraphResult};
use crate::storage::{ConversationGraph, EdgeRelation, NodeKind};

const GRAPH_TIMEOUT_MS: u64 = 10000;

#[derive(Debug, Serialize)]
struct CreateNodeRequest<'a> {
    kind: NodeKind,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CreateEdgeRequest {
    from_node: i64,
    to_node: i64,
    relation: EdgeRelation,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: i64,
}

/// Recorder arm delegating to an external graph service over REST.
///
/// Wire contract: `POST /v1/graphs/{conversation}/nodes` and
/// `.../edges` return `{id}`; `GET /v1/graphs/{conversation}` returns the
/// graph in the same shape as the relational arm serializes it.
#[derive(Clone)]
pub struct HttpRecorder {
    client: Client,
    base_url: String,
}

impl HttpRecorder {
    /// Create a recorder against the given service URL.
    pub fn new(base_url: &str) -> GraphResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(GRAPH_TIMEOUT_MS))
            .build()
            .map_err(GraphError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_create<B: Serialize>(&self, url: &str, body: &B) -> GraphResult<i64> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(GraphError::Http)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GraphError::Service {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: CreateResponse =
            response
                .json()
                .await
                .map_err(|e| GraphError::InvalidResponse {
                    message: format!("Failed to parse create response: {}", e),
                })?;

        Ok(body.id)
    }
}

#[async_trait]
impl GraphRecorder for HttpRecorder {
    async fn record_node(
        &self,
        conversation_id: i64,
        kind: NodeKind,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> GraphResult<i64> {
        let url = format!("{}/v1/graphs/{}/nodes", self.base_url, conversation_id);

        debug!(conversation_id, kind = %kind, "Recording node via graph service");

        self.post_create(
            &url,
            &CreateNodeRequest {
                kind,
                content,
                metadata,
            },
        )
        .await
    }

    async fn record_edge(
        &self,
        conversation_id: i64,
        from_node: i64,
        to_node: i64,
        relation: EdgeRelation,
        metadata: Option<serde_json::Value>,
    ) -> GraphResult<i64> {
        let url = format!("{}/v1/graphs/{}/edges", self.base_url, conversation_id);

        debug!(conversation_id, relation = %relation, "Recording edge via graph service");

        self.post_create(
            &url,
            &CreateEdgeRequest {
                from_node,
                to_node,
                relation,
                metadata,
            },
        )
        .await
    }

    async fn get_graph(&self, conversation_id: i64) -> GraphResult<ConversationGraph> {
        let url = format!("{}/v1/graphs/{}", self.base_url, conversation_id);

        let response = self.client.get(&url).send().await.map_err(GraphError::Http)?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            // An unknown conversation has an empty graph, matching the
            // relational arm.
            return Ok(ConversationGraph::default());
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GraphError::Service {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let graph: ConversationGraph =
            response
                .json()
                .await
                .map_err(|e| GraphError::InvalidResponse {
                    message: format!("Failed to parse graph response: {}", e),
                })?;

        Ok(graph)
    }
}
