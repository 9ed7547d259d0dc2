use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::SharedState;
use crate::error::{RpcError, RpcResult};
use crate::ingest::IngestJob;

/// Route method calls to appropriate handlers
pub async fn handle_method(
    state: &SharedState,
    method: &str,
    params: Option<Value>,
) -> RpcResult<Value> {
    info!(method = %method, "Routing RPC call");

    match method {
        "chat.query" => handle_chat_query(state, params).await,
        "ingest.upload" => handle_ingest_upload(state, params).await,
        "graph.get" => handle_graph_get(state, params).await,
        "ocr.extract" => handle_ocr_extract(state, params).await,
        "voice.transcribe" => handle_voice_transcribe(state, params).await,
        "ping" => Ok(Value::Object(Default::default())),
        _ => Err(RpcError::UnknownMethod {
            method: method.to_string(),
        }),
    }
}

/// Handle chat.query: run one query through the orchestrator.
async fn handle_chat_query(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    #[derive(Deserialize)]
    struct QueryParams {
        user_id: i64,
        text: String,
        #[serde(default)]
        modalities: Option<Value>,
    }

    let params: QueryParams = parse_params("chat.query", params)?;

    let reply = state
        .orchestrator
        .handle_query(params.user_id, &params.text, params.modalities)
        .await
        .map_err(RpcError::from)?;

    serde_json::to_value(reply).map_err(RpcError::Json)
}

/// Handle ingest.upload: store the file and queue background ingestion.
async fn handle_ingest_upload(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    #[derive(Deserialize)]
    struct UploadParams {
        user_id: i64,
        filename: String,
        data_base64: String,
    }

    let params: UploadParams = parse_params("ingest.upload", params)?;

    if params.filename.is_empty() {
        return Err(RpcError::InvalidParameters {
            method: "ingest.upload".to_string(),
            message: "filename required".to_string(),
        });
    }

    let data = decode_base64("ingest.upload", &params.data_base64)?;

    let path = state
        .ingest
        .save_upload(&params.filename, &data)
        .await
        .map_err(|e| RpcError::ExecutionFailed {
            message: e.to_string(),
        })?;

    let ack = state.ingest_queue.submit(IngestJob {
        path: path.clone(),
        user_id: params.user_id,
    });

    Ok(json!({
        "status": ack,
        "filepath": path.display().to_string(),
    }))
}

/// Handle graph.get: return a conversation's reasoning graph.
async fn handle_graph_get(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    #[derive(Deserialize)]
    struct GraphParams {
        conversation_id: i64,
    }

    let params: GraphParams = parse_params("graph.get", params)?;

    let graph = state
        .recorder
        .get_graph(params.conversation_id)
        .await
        .map_err(|e| RpcError::ExecutionFailed {
            message: e.to_string(),
        })?;

    if graph.is_empty() {
        return Err(RpcError::NotFound {
            message: format!("No graph found for conversation {}", params.conversation_id),
        });
    }

    serde_json::to_value(graph).map_err(RpcError::Json)
}

#[derive(Deserialize)]
struct MediaParams {
    filename: String,
    data_base64: String,
}

/// Handle ocr.extract: run an image through the OCR capability.
async fn handle_ocr_extract(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: MediaParams = parse_params("ocr.extract", params)?;

    let Some(ocr) = &state.ocr else {
        return Err(RpcError::CapabilityAbsent {
            capability: "ocr".to_string(),
        });
    };

    let data = decode_base64("ocr.extract", &params.data_base64)?;

    let text = ocr
        .extract(&params.filename, &data)
        .await
        .map_err(|e| RpcError::ExecutionFailed {
            message: e.to_string(),
        })?;

    Ok(json!({ "text": text }))
}

/// Handle voice.transcribe: run an audio clip through the speech capability.
async fn handle_voice_transcribe(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: MediaParams = parse_params("voice.transcribe", params)?;

    let Some(speech) = &state.speech else {
        return Err(RpcError::CapabilityAbsent {
            capability: "speech".to_string(),
        });
    };

    let data = decode_base64("voice.transcribe", &params.data_base64)?;

    let text = speech
        .transcribe(&params.filename, &data)
        .await
        .map_err(|e| RpcError::ExecutionFailed {
            message: e.to_string(),
        })?;

    Ok(json!({ "text": text }))
}

/// Parse typed parameters from the request's params value.
fn parse_params<T: serde::de::DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> RpcResult<T> {
    match params {
        Some(params) => serde_json::from_value(params).map_err(|e| RpcError::InvalidParameters {
            method: method.to_string(),
            message: e.to_string(),
        }),
        None => Err(RpcError::InvalidParameters {
            method: method.to_string(),
            message: "Missing params".to_string(),
        }),
    }
}

fn decode_base64(method: &str, data: &str) -> RpcResult<Vec<u8>> {
    BASE64
        .decode(data)
        .map_err(|e| RpcError::InvalidParameters {
            method: method.to_string(),
            message: format!("data_base64: {}", e),
        })
}
