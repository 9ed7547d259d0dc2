use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::Generation;
use crate::config::ModelConfig;
use crate::error::{ModelError, ModelResult};

/// Request body for the inference server's generate endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body from the inference server.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Backend that posts prompts to a local inference server
/// (Ollama-compatible `/api/generate`).
#[derive(Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    model: String,
    timeout_ms: u64,
}

impl RemoteBackend {
    /// Create a new remote backend with a bounded request timeout.
    pub fn new(config: &ModelConfig) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(ModelError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate a completion; backend failures become a degraded result.
    pub async fn generate(&self, prompt: &str) -> Generation {
        let start = Instant::now();

        match self.execute(prompt).await {
            Ok(text) => {
                info!(
                    model = %self.model,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Generation succeeded"
                );
                Generation::ok(text)
            }
            Err(e) => {
                warn!(
                    model = %self.model,
                    error = %e,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Generation failed, substituting fallback answer"
                );
                Generation::degraded(e.to_string())
            }
        }
    }

    /// Execute a single request (internal)
    async fn execute(&self, prompt: &str) -> ModelResult<String> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(model = %self.model, "Calling inference server");

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(body.response)
    }
}
