//! Clients for media-to-text services: OCR and speech transcription.
//!
//! Both are optional capabilities configured at startup. The services
//! accept base64 payloads over JSON and return extracted text; the model
//! work itself stays external to this crate.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{IngestError, IngestResult};

/// Media extraction calls can load large models server-side on first use.
const MEDIA_TIMEOUT_MS: u64 = 60000;

#[derive(Debug, Serialize)]
struct MediaRequest<'a> {
    filename: &'a str,
    data_base64: String,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    text: String,
}

/// Client for an OCR service extracting text from images.
#[derive(Clone)]
pub struct OcrClient {
    client: Client,
    base_url: String,
}

impl OcrClient {
    /// Create a new OCR client.
    pub fn new(base_url: &str) -> IngestResult<Self> {
        Ok(Self {
            client: media_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Extract text from an image.
    pub async fn extract(&self, filename: &str, data: &[u8]) -> IngestResult<String> {
        let url = format!("{}/ocr", self.base_url);
        debug!(filename, "OCR extraction");

        post_media(&self.client, &url, filename, data)
            .await
            .map_err(|message| IngestError::Ocr { message })
    }
}

/// Client for a speech-to-text service transcribing audio.
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    base_url: String,
}

impl SpeechClient {
    /// Create a new speech client.
    pub fn new(base_url: &str) -> IngestResult<Self> {
        Ok(Self {
            client: media_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Transcribe an audio clip.
    pub async fn transcribe(&self, filename: &str, data: &[u8]) -> IngestResult<String> {
        let url = format!("{}/transcribe", self.base_url);
        debug!(filename, "Speech transcription");

        post_media(&self.client, &url, filename, data)
            .await
            .map_err(|message| IngestError::Speech { message })
    }
}

fn media_client() -> IngestResult<Client> {
    Client::builder()
        .timeout(Duration::from_millis(MEDIA_TIMEOUT_MS))
        .build()
        .map_err(IngestError::Http)
}

async fn post_media(
    client: &Client,
    url: &str,
    filename: &str,
    data: &[u8],
) -> Result<String, String> {
    let response = client
        .post(url)
        .json(&MediaRequest {
            filename,
            data_base64: BASE64.encode(data),
        })
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();

    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(format!("{} - {}", status.as_u16(), error_body));
    }

    let body: MediaResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))?;

    Ok(body.text)
}
