//! Document ingestion: extract text, chunk, embed, upsert into the vector
//! index.
//!
//! Ingestion is best-effort by contract: `ingest` never reports failure to
//! its caller. A missing extractor, an absent vector capability, or a
//! transient service failure all degrade to a logged no-op. Callers that
//! need to observe ingestion run it through the queue and watch the index.

mod chunk;
mod queue;

pub use chunk::chunk_text;
pub use queue::{IngestJob, IngestQueue, SubmitAck};

use serde_json::{json, Map};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{IngestConfig, RetrievalConfig};
use crate::error::{IngestError, IngestResult};
use crate::media::OcrClient;
use crate::retrieval::{EmbeddingsClient, VectorIndexClient, VectorPoint};

/// Embedding + index pair used to store chunk vectors.
#[derive(Clone)]
pub struct VectorSink {
    pub embeddings: EmbeddingsClient,
    pub index: VectorIndexClient,
}

impl VectorSink {
    /// Build a sink from the retrieval configuration.
    pub fn from_config(config: &RetrievalConfig) -> IngestResult<Self> {
        Ok(Self {
            embeddings: EmbeddingsClient::new(&config.embeddings_url, &config.embedding_model)
                .map_err(|e| IngestError::Embedding {
                    message: e.to_string(),
                })?,
            index: VectorIndexClient::new(&config.vector_url, &config.collection).map_err(|e| {
                IngestError::Upsert {
                    message: e.to_string(),
                }
            })?,
        })
    }
}

/// Document ingestion service.
pub struct IngestService {
    config: IngestConfig,
    ocr: Option<OcrClient>,
    vectors: Option<VectorSink>,
}

impl IngestService {
    /// Create a service with explicit capabilities (used by tests and
    /// by `from_config`).
    pub fn new(config: IngestConfig, ocr: Option<OcrClient>, vectors: Option<VectorSink>) -> Self {
        Self {
            config,
            ocr,
            vectors,
        }
    }

    /// Build the service from configuration; OCR and the vector sink are
    /// present only when their endpoints are configured.
    pub fn from_config(
        config: &IngestConfig,
        retrieval: Option<&RetrievalConfig>,
    ) -> IngestResult<Self> {
        let ocr = match &config.ocr_url {
            Some(url) => Some(OcrClient::new(url)?),
            None => None,
        };
        let vectors = match retrieval {
            Some(r) => Some(VectorSink::from_config(r)?),
            None => None,
        };
        Ok(Self::new(config.clone(), ocr, vectors))
    }

    /// Save an uploaded file into the upload directory under a fresh name,
    /// returning the stored path.
    pub async fn save_upload(&self, filename: &str, data: &[u8]) -> IngestResult<PathBuf> {
        tokio::fs::create_dir_all(&self.config.upload_dir)
            .await
            .map_err(|e| IngestError::Read {
                path: self.config.upload_dir.display().to_string(),
                message: e.to_string(),
            })?;

        let ext = Path::new(filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let dest = self
            .config
            .upload_dir
            .join(format!("{}{}", Uuid::new_v4().simple(), ext));

        tokio::fs::write(&dest, data)
            .await
            .map_err(|e| IngestError::Read {
                path: dest.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(dest)
    }

    /// Ingest a file: extract text, chunk it, embed each chunk, and upsert
    /// the vectors.
    ///
    /// Best-effort: every internal failure (unreadable file, no extractor,
    /// OCR or embedding outage, index outage) is logged at warn level and
    /// swallowed. An absent vector capability still chunks the text but
    /// stores nothing. This silent-skip policy is deliberate; ingestion
    /// runs outside any request lifecycle and has no caller to notify.
    pub async fn ingest(&self, path: &Path) {
        if let Err(e) = self.try_ingest(path).await {
            warn!(path = %path.display(), error = %e, "Ingestion skipped");
        }
    }

    async fn try_ingest(&self, path: &Path) -> IngestResult<()> {
        let Some(text) = self.extract_text(path).await? else {
            debug!(path = %path.display(), "No extractor for file, skipping");
            return Ok(());
        };

        if text.trim().is_empty() {
            debug!(path = %path.display(), "Extracted no text, skipping");
            return Ok(());
        }

        let chunks = chunk_text(&text, self.config.chunk_size, self.config.chunk_overlap);
        debug!(path = %path.display(), chunks = chunks.len(), "Chunked document");

        let Some(sink) = &self.vectors else {
            debug!("No vector capability configured, chunks not stored");
            return Ok(());
        };

        let source = path.display().to_string();
        let mut points = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            let vector =
                sink.embeddings
                    .embed(chunk)
                    .await
                    .map_err(|e| IngestError::Embedding {
                        message: e.to_string(),
                    })?;

            let mut payload = Map::new();
            payload.insert("source".to_string(), json!(source));
            payload.insert("text".to_string(), json!(chunk));

            points.push(VectorPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload,
            });
        }

        sink.index
            .upsert(&points)
            .await
            .map_err(|e| IngestError::Upsert {
                message: e.to_string(),
            })?;

        debug!(path = %path.display(), points = points.len(), "Ingestion complete");
        Ok(())
    }

    /// Extract text from a file by extension.
    ///
    /// `.txt`/`.md` are read directly; image types go through OCR when the
    /// capability is configured. Everything else yields `None`.
    async fn extract_text(&self, path: &Path) -> IngestResult<Option<String>> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "txt" | "md" => {
                let bytes = tokio::fs::read(path).await.map_err(|e| IngestError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            "png" | "jpg" | "jpeg" | "tiff" => {
                let Some(ocr) = &self.ocr else {
                    return Ok(None);
                };
                let bytes = tokio::fs::read(path).await.map_err(|e| IngestError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                let filename = path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(Some(ocr.extract(&filename, &bytes).await?))
            }
            _ => Ok(None),
        }
    }
}
