//! Server module for JSON-RPC request handling.
//!
//! This module provides:
//! - A newline-delimited JSON-RPC 2.0 server over TCP
//! - Method handlers and routing
//! - Shared application state management

mod handlers;
mod rpc;

pub use handlers::*;
pub use rpc::*;

use std::sync::Arc;

use crate::chat::ChatOrchestrator;
use crate::config::Config;
use crate::graph::GraphRecorder;
use crate::ingest::{IngestQueue, IngestService};
use crate::media::{OcrClient, SpeechClient};
use crate::model::GenerationBackend;
use crate::retrieval::Retriever;
use crate::storage::SqliteStorage;

/// Application state shared across connections and handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// The chat orchestrator handling queries.
    pub orchestrator: ChatOrchestrator,
    /// Reasoning-graph recorder (relational or HTTP service arm).
    pub recorder: Arc<dyn GraphRecorder>,
    /// Document ingestion service.
    pub ingest: Arc<IngestService>,
    /// Background ingestion queue handle.
    pub ingest_queue: IngestQueue,
    /// OCR capability, when configured.
    pub ocr: Option<OcrClient>,
    /// Speech-to-text capability, when configured.
    pub speech: Option<SpeechClient>,
}

impl AppState {
    /// Assemble application state from its wired parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        storage: SqliteStorage,
        model: GenerationBackend,
        retriever: Option<Retriever>,
        recorder: Arc<dyn GraphRecorder>,
        ingest: Arc<IngestService>,
        ingest_queue: IngestQueue,
        ocr: Option<OcrClient>,
        speech: Option<SpeechClient>,
    ) -> Self {
        let preview_len = config
            .retrieval
            .as_ref()
            .map(|r| r.preview_len)
            .unwrap_or(400);

        let orchestrator = ChatOrchestrator::new(
            Arc::new(storage.clone()),
            model,
            retriever,
            recorder.clone(),
        )
        .with_preview_len(preview_len);

        Self {
            config,
            storage,
            orchestrator,
            recorder,
            ingest,
            ingest_queue,
            ocr,
            speech,
        }
    }
}

/// Shared reference to application state.
pub type SharedState = Arc<AppState>;
