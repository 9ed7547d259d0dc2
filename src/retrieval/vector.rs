use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{RetrievalError, RetrievalResult};

const INDEX_TIMEOUT_MS: u64 = 30000;

/// A point to upsert into the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorPoint {
    /// Point id (UUID string).
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Payload metadata stored alongside the vector.
    pub payload: Map<String, Value>,
}

/// A scored point returned by a vector search.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredPoint {
    /// Point id.
    pub id: Value,
    /// Similarity score.
    pub score: f32,
    /// Payload metadata.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Stored vector, present when requested with `with_vector`.
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: &'a [VectorPoint],
}

/// Client for a Qdrant-compatible vector index over REST.
#[derive(Clone)]
pub struct VectorIndexClient {
    client: Client,
    base_url: String,
    collection: String,
}

impl VectorIndexClient {
    /// Create a new vector index client.
    pub fn new(base_url: &str, collection: &str) -> RetrievalResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(INDEX_TIMEOUT_MS))
            .build()
            .map_err(RetrievalError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
        })
    }

    /// Search the collection for the `limit` nearest points, returning
    /// payloads and stored vectors.
    pub async fn search(&self, vector: &[f32], limit: usize) -> RetrievalResult<Vec<ScoredPoint>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        debug!(collection = %self.collection, limit, "Vector search");

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest {
                vector,
                limit,
                with_payload: true,
                with_vector: true,
            })
            .send()
            .await
            .map_err(RetrievalError::Http)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Search {
                message: format!("{} - {}", status.as_u16(), error_body),
            });
        }

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::InvalidResponse {
                    message: format!("Failed to parse search response: {}", e),
                })?;

        Ok(body.result)
    }

    /// Upsert points into the collection.
    pub async fn upsert(&self, points: &[VectorPoint]) -> RetrievalResult<()> {
        let url = format!("{}/collections/{}/points", self.base_url, self.collection);

        debug!(collection = %self.collection, count = points.len(), "Vector upsert");

        let response = self
            .client
            .put(&url)
            .json(&UpsertRequest { points })
            .send()
            .await
            .map_err(RetrievalError::Http)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Search {
                message: format!("upsert: {} - {}", status.as_u16(), error_body),
            });
        }

        Ok(())
    }
}
