use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub database: DatabaseConfig,
    pub retrieval: Option<RetrievalConfig>,
    pub ingest: IngestConfig,
    pub graph: GraphConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Model backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackendKind {
    /// In-process generation (no remote calls).
    Local,
    /// Remote HTTP inference server.
    Remote,
}

/// Model backend configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub backend: ModelBackendKind,
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Retrieval capability configuration.
///
/// Present only when `VECTOR_URL` is set; absence disables retrieval for the
/// whole process lifetime.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub vector_url: String,
    pub collection: String,
    pub embeddings_url: String,
    pub embedding_model: String,
    pub top_k: usize,
    pub fetch_k: usize,
    pub preview_len: usize,
    pub mmr_lambda: f32,
}

/// Ingest pipeline configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub upload_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub queue_capacity: usize,
    /// OCR service endpoint; `None` disables image extraction.
    pub ocr_url: Option<String>,
    /// Speech-to-text service endpoint; `None` disables transcription.
    pub speech_url: Option<String>,
}

/// Reasoning-graph backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphBackendKind {
    /// Persist nodes/edges in the relational store (reference behavior).
    Relational,
    /// Delegate to an external graph service over HTTP.
    Service,
}

/// Reasoning-graph recorder configuration
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub backend: GraphBackendKind,
    pub service_url: Option<String>,
}

/// RPC server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let model = ModelConfig {
            backend: match env::var("MODEL_BACKEND")
                .unwrap_or_else(|_| "remote".to_string())
                .to_lowercase()
                .as_str()
            {
                "local" => ModelBackendKind::Local,
                "remote" => ModelBackendKind::Remote,
                other => {
                    return Err(AppError::Config {
                        message: format!("Unknown MODEL_BACKEND: {}", other),
                    })
                }
            },
            base_url: env::var("MODEL_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: env::var("MODEL_NAME").unwrap_or_else(|_| "llama2".to_string()),
            timeout_ms: env::var("MODEL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15000),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/chatgraph.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        // Retrieval is a capability: configured iff VECTOR_URL is present.
        let retrieval = env::var("VECTOR_URL").ok().map(|vector_url| RetrievalConfig {
            vector_url,
            collection: env::var("VECTOR_COLLECTION").unwrap_or_else(|_| "docs".to_string()),
            embeddings_url: env::var("EMBEDDINGS_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            top_k: env::var("RETRIEVAL_TOP_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            fetch_k: env::var("RETRIEVAL_FETCH_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(12),
            preview_len: env::var("RETRIEVAL_PREVIEW_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(400),
            mmr_lambda: env::var("RETRIEVAL_MMR_LAMBDA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.7),
        });

        let ingest = IngestConfig {
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "./data/uploads".to_string()),
            ),
            chunk_size: env::var("CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(800),
            chunk_overlap: env::var("CHUNK_OVERLAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            queue_capacity: env::var("INGEST_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
            ocr_url: env::var("OCR_URL").ok(),
            speech_url: env::var("SPEECH_URL").ok(),
        };

        let graph = GraphConfig {
            backend: match env::var("GRAPH_BACKEND")
                .unwrap_or_else(|_| "relational".to_string())
                .to_lowercase()
                .as_str()
            {
                "relational" => GraphBackendKind::Relational,
                "service" => GraphBackendKind::Service,
                other => {
                    return Err(AppError::Config {
                        message: format!("Unknown GRAPH_BACKEND: {}", other),
                    })
                }
            },
            service_url: env::var("GRAPH_SERVICE_URL").ok(),
        };

        if graph.backend == GraphBackendKind::Service && graph.service_url.is_none() {
            return Err(AppError::Config {
                message: "GRAPH_SERVICE_URL is required when GRAPH_BACKEND=service".to_string(),
            });
        }

        let server = ServerConfig {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8750".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            model,
            database,
            retrieval,
            ingest,
            graph,
            server,
            logging,
        })
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackendKind::Remote,
            base_url: "http://localhost:11434".to_string(),
            model: "llama2".to_string(),
            timeout_ms: 15000,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/uploads"),
            chunk_size: 800,
            chunk_overlap: 100,
            queue_capacity: 64,
            ocr_url: None,
            speech_url: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_url: "http://localhost:6333".to_string(),
            collection: "docs".to_string(),
            embeddings_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            top_k: 3,
            fetch_k: 12,
            preview_len: 400,
            mmr_lambda: 0.7,
        }
    }
}
