//! Reasoning-graph recorder: nodes and typed edges for one conversation
//! turn.
//!
//! The recorder is polymorphic over two arms selected once at startup and
//! fixed for the service's lifetime: a relational arm persisting into the
//! local store (the reference behavior) and an HTTP arm delegating to an
//! external graph service. Selection is explicit configuration; the HTTP
//! arm is never silently routed to the relational fallback.

mod http;
mod relational;

pub use http::HttpRecorder;
pub use relational::RelationalRecorder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{GraphBackendKind, GraphConfig};
use crate::error::{GraphError, GraphResult};
use crate::storage::{ConversationGraph, EdgeRelation, NodeKind, Storage};

/// Records reasoning-graph nodes and edges and reads back whole graphs.
///
/// Nodes and edges always belong to a conversation; edges must reference
/// nodes recorded in the same conversation.
#[async_trait]
pub trait GraphRecorder: Send + Sync {
    /// Record a node and return its id.
    async fn record_node(
        &self,
        conversation_id: i64,
        kind: NodeKind,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> GraphResult<i64>;

    /// Record an edge between two nodes of the same conversation and
    /// return its id.
    async fn record_edge(
        &self,
        conversation_id: i64,
        from_node: i64,
        to_node: i64,
        relation: EdgeRelation,
        metadata: Option<serde_json::Value>,
    ) -> GraphResult<i64>;

    /// Read the full graph of a conversation. A conversation with no
    /// recorded steps yields an empty graph.
    async fn get_graph(&self, conversation_id: i64) -> GraphResult<ConversationGraph>;
}

/// Build the recorder arm selected by configuration.
pub fn build_recorder(
    config: &GraphConfig,
    storage: Arc<dyn Storage>,
) -> GraphResult<Arc<dyn GraphRecorder>> {
    match config.backend {
        GraphBackendKind::Relational => Ok(Arc::new(RelationalRecorder::new(storage))),
        GraphBackendKind::Service => {
            let url = config
                .service_url
                .as_deref()
                .ok_or(GraphError::InvalidResponse {
                    message: "graph service URL missing".to_string(),
                })?;
            Ok(Arc::new(HttpRecorder::new(url)?))
        }
    }
}
