//! Model adapter: a uniform text-generation interface over interchangeable
//! backends.
//!
//! `GenerationBackend` is an enum over concrete backends; add a new module
//! and variant for each additional backend. The adapter's contract is that
//! `generate` never fails: backend errors are converted into a `Degraded`
//! result carrying a fixed fallback answer and the failure reason, so
//! callers branch on status instead of sniffing the answer text.

mod local;
mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use serde::{Deserialize, Serialize};

use crate::config::{ModelBackendKind, ModelConfig};
use crate::error::ModelResult;

/// Fallback answer substituted when generation fails.
pub const FALLBACK_ANSWER: &str = "Sorry, I could not generate an answer this time.";

/// Outcome of a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// The backend produced a real completion.
    Ok,
    /// The backend failed; `text` holds the fallback answer.
    Degraded,
}

/// Result of a generation call. Always well-formed; check `status` to
/// distinguish a real completion from the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// Whether the backend produced a real completion.
    pub status: GenerationStatus,
    /// The completion, or the fallback answer when degraded.
    pub text: String,
    /// Failure reason when degraded.
    pub reason: Option<String>,
}

impl Generation {
    /// A successful completion.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: GenerationStatus::Ok,
            text: text.into(),
            reason: None,
        }
    }

    /// A degraded result with the fallback answer.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            status: GenerationStatus::Degraded,
            text: FALLBACK_ANSWER.to_string(),
            reason: Some(reason.into()),
        }
    }

    /// True when the backend failed and `text` is the fallback.
    pub fn is_degraded(&self) -> bool {
        self.status == GenerationStatus::Degraded
    }
}

/// All available generation backends.
///
/// Enum dispatch avoids trait objects; adding a backend = new module +
/// new variant + new `generate` arm.
#[derive(Clone)]
pub enum GenerationBackend {
    /// In-process generation (deterministic, no remote calls).
    Local(LocalBackend),
    /// Remote HTTP inference server.
    Remote(RemoteBackend),
}

impl GenerationBackend {
    /// Construct the backend selected by configuration.
    pub fn from_config(config: &ModelConfig) -> ModelResult<Self> {
        match config.backend {
            ModelBackendKind::Local => Ok(GenerationBackend::Local(LocalBackend::new())),
            ModelBackendKind::Remote => Ok(GenerationBackend::Remote(RemoteBackend::new(config)?)),
        }
    }

    /// Generate a completion for `prompt`.
    ///
    /// Never fails: backend errors become a `Degraded` generation.
    pub async fn generate(&self, prompt: &str) -> Generation {
        match self {
            GenerationBackend::Local(backend) => backend.generate(prompt).await,
            GenerationBackend::Remote(backend) => backend.generate(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_generation() {
        let generation = Generation::ok("an answer");
        assert_eq!(generation.status, GenerationStatus::Ok);
        assert_eq!(generation.text, "an answer");
        assert!(generation.reason.is_none());
        assert!(!generation.is_degraded());
    }

    #[test]
    fn test_degraded_generation_carries_fallback() {
        let generation = Generation::degraded("connection refused");
        assert!(generation.is_degraded());
        assert_eq!(generation.text, FALLBACK_ANSWER);
        assert_eq!(generation.reason.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&GenerationStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
