use tracing::warn;

use super::Generation;

/// Longest prompt prefix echoed back by the local backend.
const ECHO_LIMIT: usize = 200;

/// In-process backend standing in for a locally loaded generation pipeline.
///
/// Produces a deterministic completion from the prompt without any remote
/// call. Useful for development and for running the full chat flow without
/// an inference server. The synchronous generation runs under
/// `spawn_blocking` so a heavyweight local pipeline cannot stall the
/// request task.
#[derive(Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create a new local backend.
    pub fn new() -> Self {
        Self
    }

    /// Generate a completion for `prompt`.
    pub async fn generate(&self, prompt: &str) -> Generation {
        let prompt = prompt.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let end = prompt
                .char_indices()
                .map(|(i, _)| i)
                .nth(ECHO_LIMIT)
                .unwrap_or(prompt.len());
            format!("[echo] {}", &prompt[..end])
        })
        .await;

        match result {
            Ok(text) => Generation::ok(text),
            Err(e) => {
                warn!(error = %e, "Local generation task failed");
                Generation::degraded(format!("local generation task failed: {}", e))
            }
        }
    }
}
