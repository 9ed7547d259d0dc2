use std::sync::Arc;

use async_trait::async_trait;

use super::GraphRecorder;
use crate::error::GraphResult;
use crate::storage::{ConversationGraph, EdgeRelation, NodeKind, Storage};

/// Recorder arm persisting the graph into the relational store.
///
/// This is the reference behavior; the HTTP arm must match it.
pub struct RelationalRecorder {
    storage: Arc<dyn Storage>,
}

impl RelationalRecorder {
    /// Create a recorder over the given store.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl GraphRecorder for RelationalRecorder {
    async fn record_node(
        &self,
        conversation_id: i64,
        kind: NodeKind,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> GraphResult<i64> {
        let id = self
            .storage
            .create_graph_node(conversation_id, kind, content, metadata)
            .await?;
        Ok(id)
    }

    async fn record_edge(
        &self,
        conversation_id: i64,
        from_node: i64,
        to_node: i64,
        relation: EdgeRelation,
        metadata: Option<serde_json::Value>,
    ) -> GraphResult<i64> {
        let id = self
            .storage
            .create_graph_edge(conversation_id, from_node, to_node, relation, metadata)
            .await?;
        Ok(id)
    }

    async fn get_graph(&self, conversation_id: i64) -> GraphResult<ConversationGraph> {
        let graph = self.storage.get_graph(conversation_id).await?;
        Ok(graph)
    }
}
