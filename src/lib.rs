//! # Chatgraph
//!
//! A conversational RAG assistant that records every turn as a small
//! reasoning graph: user message, retrieved context, generated answer,
//! and the typed edges between them.
//!
//! ## Features
//!
//! - **Chat orchestration**: retrieval, generation, graph recording, and
//!   message persistence for one query, with per-step failure isolation
//! - **Model adapter**: a uniform generate interface over a remote HTTP
//!   inference server or an in-process backend
//! - **Retrieval capability**: embeddings + vector search with maximal
//!   marginal relevance selection, present or absent by configuration
//! - **Reasoning-graph recorder**: relational arm or external graph
//!   service arm, selected once at startup
//! - **Document ingestion**: extract, chunk, embed, upsert; best-effort,
//!   queued outside the request lifecycle
//!
//! ## Architecture
//!
//! ```text
//! RPC Client → JSON-RPC over TCP → Chat Orchestrator → Model backend (HTTP)
//!                                        ↓                Vector index (HTTP)
//!                                  SQLite (conversations,
//!                                  messages, graph)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatgraph::{Config, AppState, RpcServer};
//! use chatgraph::graph::build_recorder;
//! use chatgraph::ingest::{IngestQueue, IngestService};
//! use chatgraph::model::GenerationBackend;
//! use chatgraph::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let model = GenerationBackend::from_config(&config.model)?;
//!     let recorder = build_recorder(&config.graph, Arc::new(storage.clone()))?;
//!     let ingest = Arc::new(IngestService::from_config(&config.ingest, None)?);
//!     let (queue, _worker) = IngestQueue::start(ingest.clone(), 64);
//!     let state = Arc::new(AppState::new(
//!         config, storage, model, None, recorder, ingest, queue, None, None,
//!     ));
//!     RpcServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Chat orchestration: the core query flow.
pub mod chat;
/// Configuration management for the service.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Reasoning-graph recorder over relational or HTTP-service arms.
pub mod graph;
/// Document ingestion: extraction, chunking, embedding, queueing.
pub mod ingest;
/// Clients for media-to-text services (OCR, speech).
pub mod media;
/// Model adapter over interchangeable generation backends.
pub mod model;
/// Retrieval capability: embeddings, vector search, MMR selection.
pub mod retrieval;
/// JSON-RPC server implementation and request handling.
pub mod server;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, RpcServer, SharedState};
