use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: i64 },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Model backend errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Retrieval capability errors
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {message}")]
    Embedding { message: String },

    #[error("Vector search failed: {message}")]
    Search { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Reasoning-graph recorder errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Node requires a conversation")]
    NoConversation,

    #[error("Graph not found for conversation {conversation_id}")]
    NotFound { conversation_id: i64 },

    #[error("Graph service error: {status} - {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Ingest pipeline errors.
///
/// These never cross the `IngestService::ingest` boundary (ingestion is
/// best-effort and swallows them after logging); they exist so internal
/// steps can use `?` and tests can assert on failure shapes.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Read failed for {path}: {message}")]
    Read { path: String, message: String },

    #[error("No extractor for {path}")]
    NoExtractor { path: String },

    #[error("OCR failed: {message}")]
    Ocr { message: String },

    #[error("Transcription failed: {message}")]
    Speech { message: String },

    #[error("Embedding failed: {message}")]
    Embedding { message: String },

    #[error("Vector upsert failed: {message}")]
    Upsert { message: String },

    #[error("Queue rejected job: {message}")]
    QueueRejected { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// JSON-RPC protocol errors
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown method: {method}")]
    UnknownMethod { method: String },

    #[error("Invalid parameters for {method}: {message}")]
    InvalidParameters { method: String, message: String },

    #[error("Capability not configured: {capability}")]
    CapabilityAbsent { capability: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for RpcError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidInput { message } => RpcError::InvalidRequest { message },
            other => RpcError::ExecutionFailed {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for model backend operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type alias for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Result type alias for graph recorder operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type alias for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type alias for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::InvalidInput {
            message: "text required".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid input: text required");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database connection failed: failed to connect"
        );

        let err = StorageError::ConversationNotFound { conversation_id: 7 };
        assert_eq!(err.to_string(), "Conversation not found: 7");
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::Api {
            status: 500,
            message: "server error".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 500 - server error");

        let err = ModelError::Timeout { timeout_ms: 15000 };
        assert_eq!(err.to_string(), "Request timeout after 15000ms");
    }

    #[test]
    fn test_graph_error_display() {
        let err = GraphError::NoConversation;
        assert_eq!(err.to_string(), "Node requires a conversation");

        let err = GraphError::NotFound { conversation_id: 3 };
        assert_eq!(err.to_string(), "Graph not found for conversation 3");
    }

    #[test]
    fn test_rpc_error_display() {
        let err = RpcError::UnknownMethod {
            method: "nonexistent".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown method: nonexistent");

        let err = RpcError::CapabilityAbsent {
            capability: "ocr".to_string(),
        };
        assert_eq!(err.to_string(), "Capability not configured: ocr");
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_request() {
        let app_err = AppError::InvalidInput {
            message: "text required".to_string(),
        };
        let rpc_err: RpcError = app_err.into();
        assert!(matches!(rpc_err, RpcError::InvalidRequest { .. }));
    }

    #[test]
    fn test_storage_error_conversion_to_app_error() {
        let storage_err = StorageError::ConversationNotFound { conversation_id: 1 };
        let app_err: AppError = storage_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
    }

    #[test]
    fn test_retrieval_error_conversion_to_app_error() {
        let err = RetrievalError::Search {
            message: "index offline".to_string(),
        };
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Retrieval(_)));
    }
}
