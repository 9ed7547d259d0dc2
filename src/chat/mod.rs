//! Chat orchestration: the query flow from inbound text to answered reply.
//!
//! One `handle_query` call sequences conversation creation, retrieval,
//! generation, reasoning-graph recording, and message persistence. Every
//! side-effecting step is independently failable and strictly best-effort:
//! the orchestrator always returns a well-formed reply, and no internal
//! failure propagates past input validation. Callers must not assume the
//! graph or the message log reflects the returned answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::graph::GraphRecorder;
use crate::model::{GenerationBackend, GenerationStatus};
use crate::retrieval::Retriever;
use crate::storage::{EdgeRelation, NodeKind, Sender, Storage};

/// Conversation titles keep this many characters of the first query.
const TITLE_LIMIT: usize = 80;

/// Default preview length for retrieval node content.
const DEFAULT_PREVIEW_LEN: usize = 400;

/// A citation identifying the retrieved passage behind an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Source document path.
    pub source: String,
    /// Similarity score of the passage against the query.
    pub score: f32,
}

/// The reply to one query. Always well-formed regardless of which internal
/// steps failed; `status` distinguishes a real answer from the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// The generated answer, or the fallback text when degraded.
    pub answer: String,
    /// Citations for the retrieved passages, in retrieval order.
    pub sources: Vec<Citation>,
    /// The conversation this turn belongs to; `None` when conversation
    /// creation failed.
    pub conversation_id: Option<i64>,
    /// Whether generation produced a real completion.
    pub status: GenerationStatus,
    /// Failure reason when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Orchestrates one query end to end.
pub struct ChatOrchestrator {
    storage: Arc<dyn Storage>,
    model: GenerationBackend,
    retriever: Option<Retriever>,
    recorder: Arc<dyn GraphRecorder>,
    preview_len: usize,
}

impl ChatOrchestrator {
    /// Create an orchestrator. The retriever is an optional capability
    /// fixed for the orchestrator's lifetime.
    pub fn new(
        storage: Arc<dyn Storage>,
        model: GenerationBackend,
        retriever: Option<Retriever>,
        recorder: Arc<dyn GraphRecorder>,
    ) -> Self {
        Self {
            storage,
            model,
            retriever,
            recorder,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Override the retrieval preview length.
    pub fn with_preview_len(mut self, preview_len: usize) -> Self {
        self.preview_len = preview_len;
        self
    }

    /// Handle one query: retrieve, generate, record the reasoning graph,
    /// persist the messages, and reply.
    ///
    /// The only error is empty-text rejection, raised before any backend
    /// is touched. Everything downstream degrades instead of failing.
    pub async fn handle_query(
        &self,
        user_id: i64,
        text: &str,
        modalities: Option<serde_json::Value>,
    ) -> AppResult<ChatReply> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput {
                message: "text required".to_string(),
            });
        }

        // 1) Conversation, created lazily for the turn. Failure degrades
        // graph recording and message linkage, not the answer.
        let conversation_id = match self
            .storage
            .create_conversation(user_id, truncate_chars(text, TITLE_LIMIT))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Conversation creation failed, continuing without one");
                None
            }
        };

        // Graph nodes require a conversation; without one the whole
        // recording step is skipped and the edge invariant holds trivially.
        let user_node = match conversation_id {
            Some(cid) => self
                .record_node(cid, NodeKind::User, text, json!({ "user_id": user_id }))
                .await,
            None => None,
        };

        // 2) Retrieval, only when the capability is configured. A failed
        // search is indistinguishable from "nothing relevant".
        let mut sources = Vec::new();
        let mut retrieval_nodes = Vec::new();

        if let Some(retriever) = &self.retriever {
            match retriever.search(text).await {
                Ok(passages) => {
                    for passage in passages {
                        let preview = truncate_chars(&passage.content, self.preview_len);
                        sources.push(Citation {
                            source: passage.source.clone(),
                            score: passage.score,
                        });
                        if let Some(cid) = conversation_id {
                            if let Some(node_id) = self
                                .record_node(
                                    cid,
                                    NodeKind::Retrieval,
                                    preview,
                                    json!({ "source": passage.source, "score": passage.score }),
                                )
                                .await
                            {
                                retrieval_nodes.push(node_id);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Retrieval failed, answering without context");
                }
            }
        }

        // 3) Generation, always, from the raw query text. Retrieved
        // passages are recorded but not injected into the prompt.
        let generation = self.model.generate(text).await;

        // 4) Generation node, only for a real completion.
        let generation_node = match (conversation_id, generation.is_degraded()) {
            (Some(cid), false) => {
                self.record_node(
                    cid,
                    NodeKind::Generation,
                    &generation.text,
                    json!({ "status": generation.status }),
                )
                .await
            }
            _ => None,
        };

        // 5) Edges; each creation failure is swallowed on its own.
        if let Some(cid) = conversation_id {
            if let (Some(u), Some(g)) = (user_node, generation_node) {
                self.record_edge(cid, u, g, EdgeRelation::AskedFor).await;
            }
            for &r in &retrieval_nodes {
                if let Some(u) = user_node {
                    self.record_edge(cid, u, r, EdgeRelation::Retrieved).await;
                }
                if let Some(g) = generation_node {
                    self.record_edge(cid, r, g, EdgeRelation::Informed).await;
                }
            }
        }

        // 6) Message log, best-effort.
        let user_metadata = json!({ "user_id": user_id, "modalities": modalities });
        if let Err(e) = self
            .storage
            .create_message(conversation_id, Sender::User, text, Some(user_metadata))
            .await
        {
            warn!(error = %e, "Failed to persist user message");
        }

        let bot_metadata = json!({ "sources": &sources, "status": generation.status });
        if let Err(e) = self
            .storage
            .create_message(
                conversation_id,
                Sender::Bot,
                &generation.text,
                Some(bot_metadata),
            )
            .await
        {
            warn!(error = %e, "Failed to persist bot message");
        }

        info!(
            user_id,
            conversation_id,
            sources = sources.len(),
            degraded = generation.is_degraded(),
            "Query handled"
        );

        Ok(ChatReply {
            answer: generation.text,
            sources,
            conversation_id,
            status: generation.status,
            reason: generation.reason,
        })
    }

    async fn record_node(
        &self,
        conversation_id: i64,
        kind: NodeKind,
        content: &str,
        metadata: serde_json::Value,
    ) -> Option<i64> {
        match self
            .recorder
            .record_node(conversation_id, kind, content, Some(metadata))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(conversation_id, kind = %kind, error = %e, "Failed to record graph node");
                None
            }
        }
    }

    async fn record_edge(
        &self,
        conversation_id: i64,
        from_node: i64,
        to_node: i64,
        relation: EdgeRelation,
    ) {
        match self
            .recorder
            .record_edge(conversation_id, from_node, to_node, relation, None)
            .await
        {
            Ok(id) => {
                debug!(conversation_id, edge_id = id, relation = %relation, "Edge recorded");
            }
            Err(e) => {
                warn!(conversation_id, relation = %relation, error = %e, "Failed to record graph edge");
            }
        }
    }
}

/// Truncate to at most `max` characters without splitting a UTF-8
/// sequence.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
