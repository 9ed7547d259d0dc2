use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{RetrievalError, RetrievalResult};

/// Embedding requests use a generous fixed timeout; embedding servers are
/// local and fast, but cold model loads can take a while.
const EMBED_TIMEOUT_MS: u64 = 30000;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Client for an Ollama-compatible embeddings endpoint.
#[derive(Clone)]
pub struct EmbeddingsClient {
    client: Client,
    base_url: String,
    model: String,
}

impl EmbeddingsClient {
    /// Create a new embeddings client.
    pub fn new(base_url: &str, model: &str) -> RetrievalResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(EMBED_TIMEOUT_MS))
            .build()
            .map_err(RetrievalError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Embed `text` into a vector.
    pub async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        debug!(model = %self.model, "Embedding text");

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(RetrievalError::Http)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding {
                message: format!("{} - {}", status.as_u16(), error_body),
            });
        }

        let body: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::InvalidResponse {
                    message: format!("Failed to parse embedding response: {}", e),
                })?;

        Ok(body.embedding)
    }
}
