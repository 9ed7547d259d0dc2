//! JSON-RPC 2.0 transport: newline-delimited messages over TCP.
//!
//! Each accepted connection gets its own task running a read-dispatch-write
//! loop; requests without an id are notifications and get no response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use super::{handle_method, SharedState};
use crate::error::RpcError;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null if absent, must always be present per spec).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Map an `RpcError` to its JSON-RPC error code.
fn error_code(error: &RpcError) -> i32 {
    match error {
        RpcError::InvalidRequest { .. } => -32600,
        RpcError::UnknownMethod { .. } => -32601,
        RpcError::InvalidParameters { .. } => -32602,
        RpcError::Json(_) | RpcError::ExecutionFailed { .. } => -32603,
        RpcError::NotFound { .. } => -32001,
        RpcError::CapabilityAbsent { .. } => -32002,
    }
}

/// JSON-RPC server over TCP.
pub struct RpcServer {
    /// Shared application state.
    state: SharedState,
}

impl RpcServer {
    /// Create a new RPC server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Bind the configured address and serve forever.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.state.config.server.listen_addr).await?;
        info!(addr = %listener.local_addr()?, "RPC server listening");
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener (used by tests to
    /// bind an ephemeral port).
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(peer = %peer, "Connection accepted");

            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(state, stream).await {
                    warn!(error = %e, "Connection closed with error");
                }
            });
        }
    }
}

/// Run one connection's read-dispatch-write loop until EOF.
async fn handle_connection(state: SharedState, stream: TcpStream) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        // EOF reached
        if bytes_read == 0 {
            debug!("EOF received, closing connection");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!(request = %trimmed, "Received request");

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => handle_request(&state, request).await,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(
                    None,
                    -32700,
                    format!("Parse error: {}", e),
                ))
            }
        };

        // Only send a response if not a notification (per JSON-RPC 2.0 spec)
        if let Some(response) = response {
            let response_json = serde_json::to_string(&response)?;
            debug!(response = %response_json, "Sending response");

            write_half.write_all(response_json.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
            write_half.flush().await?;
        }
    }

    Ok(())
}

/// Handle a single JSON-RPC request.
/// Returns None for notifications (requests without id) per JSON-RPC 2.0.
async fn handle_request(state: &SharedState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let is_notification = request.id.is_none();

    let result = handle_method(state, &request.method, request.params).await;

    if is_notification {
        if let Err(e) = result {
            debug!(method = %request.method, error = %e, "Notification failed, no response sent");
        }
        return None;
    }

    Some(match result {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(e) => {
            error!(method = %request.method, error = %e, "Method failed");
            JsonRpcResponse::error(request.id, error_code(&e), e.to_string())
        }
    })
}
