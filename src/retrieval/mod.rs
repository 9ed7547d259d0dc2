//! Retrieval capability: embedding, vector search, and passage selection.
//!
//! A `Retriever` is either present or absent for the whole process
//! lifetime, decided at startup from configuration and injected into the
//! orchestrator as an `Option`. Search embeds the query, fetches a
//! candidate pool from the vector index, and selects the final passages by
//! maximal marginal relevance.

mod embeddings;
mod mmr;
mod vector;

pub use embeddings::EmbeddingsClient;
pub use mmr::mmr_select;
pub use vector::{ScoredPoint, VectorIndexClient, VectorPoint};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::RetrievalResult;

/// A passage returned by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Chunk text.
    pub content: String,
    /// Source document path the chunk came from.
    pub source: String,
    /// Similarity score against the query.
    pub score: f32,
}

/// Retriever over an embeddings service and a vector index.
#[derive(Clone)]
pub struct Retriever {
    embeddings: EmbeddingsClient,
    index: VectorIndexClient,
    top_k: usize,
    fetch_k: usize,
    mmr_lambda: f32,
}

impl Retriever {
    /// Build a retriever from configuration.
    pub fn new(config: &RetrievalConfig) -> RetrievalResult<Self> {
        Ok(Self {
            embeddings: EmbeddingsClient::new(&config.embeddings_url, &config.embedding_model)?,
            index: VectorIndexClient::new(&config.vector_url, &config.collection)?,
            top_k: config.top_k,
            fetch_k: config.fetch_k.max(config.top_k),
            mmr_lambda: config.mmr_lambda,
        })
    }

    /// Search the index for the passages most relevant to `query`.
    ///
    /// Fetches `fetch_k` candidates with their vectors, then narrows to
    /// `top_k` by maximal marginal relevance so near-duplicate chunks do
    /// not crowd out distinct sources.
    pub async fn search(&self, query: &str) -> RetrievalResult<Vec<Passage>> {
        let query_vector = self.embeddings.embed(query).await?;

        let candidates = self.index.search(&query_vector, self.fetch_k).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let vectors: Vec<Vec<f32>> = candidates
            .iter()
            .map(|c| c.vector.clone().unwrap_or_default())
            .collect();

        let selected = mmr_select(&query_vector, &vectors, self.top_k, self.mmr_lambda);

        debug!(
            candidates = candidates.len(),
            selected = selected.len(),
            "Retrieval search complete"
        );

        Ok(selected
            .into_iter()
            .map(|i| {
                let candidate = &candidates[i];
                Passage {
                    content: candidate
                        .payload
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    source: candidate
                        .payload
                        .get("source")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    score: candidate.score,
                }
            })
            .collect())
    }
}
