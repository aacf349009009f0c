use super::extract::{FieldExtractor, ScanExtractor};
use super::multipart::{new_boundary, MultipartUpload};
use super::types::{TranscriptionError, TranscriptionRequest, TranscriptionResult};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Field holding the transcript in the service response
const TEXT_FIELD: &str = "text";

/// Cap on one whole exchange (connect, upload, response) unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Speech-to-text backend
///
/// Failures come back as values; implementations never panic across this
/// boundary.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, request: TranscriptionRequest) -> TranscriptionResult;
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint
#[derive(Clone)]
pub struct WhisperClient {
    http: reqwest::Client,
    extractor: Arc<dyn FieldExtractor>,
    timeout: Duration,
}

impl WhisperClient {
    pub fn new() -> Self {
        Self::with_http(reqwest::Client::new())
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            http,
            extractor: Arc::new(ScanExtractor),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the per-request cap; a stalled server then surfaces as `Network`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace how the transcript is pulled out of a 200 response
    pub fn with_extractor(mut self, extractor: impl FieldExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Map a 200 body onto the result
    pub fn interpret_body(&self, body: &str) -> TranscriptionResult {
        match self.extractor.extract(body, TEXT_FIELD) {
            None => Err(TranscriptionError::Parse),
            Some(text) if text.is_empty() => Err(TranscriptionError::EmptyResult),
            Some(text) => Ok(text),
        }
    }
}

impl Default for WhisperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, request: TranscriptionRequest) -> TranscriptionResult {
        let settings = &request.settings;

        info!(
            "Starting transcription: endpoint={}, key={}",
            if settings.endpoint.trim().is_empty() { "EMPTY" } else { "SET" },
            if settings.api_key.trim().is_empty() { "EMPTY" } else { "SET" }
        );

        if !settings.is_configured() {
            error!("Transcription API not configured");
            return Err(TranscriptionError::NotConfigured);
        }

        let upload = MultipartUpload::open(
            &request.audio_file,
            &settings.model,
            &settings.response_format,
            new_boundary(),
        )
        .await
        .map_err(|e| {
            error!("Failed to open {}: {}", request.audio_file.display(), e);
            TranscriptionError::AudioFile(e.to_string())
        })?;

        let content_type = upload.content_type();
        let content_length = upload.content_length();

        let response = self
            .http
            .post(settings.endpoint.trim())
            .timeout(self.timeout)
            .header(AUTHORIZATION, format!("Bearer {}", settings.api_key.trim()))
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(upload.into_stream()))
            .send()
            .await
            .map_err(|e| {
                error!("Transcription request failed: {}", e);
                TranscriptionError::Network(e.to_string())
            })?;

        let status = response.status();
        info!("Transcription response code={}", status.as_u16());

        let body = response.text().await.map_err(|e| {
            error!("Failed to read transcription response: {}", e);
            TranscriptionError::Network(e.to_string())
        })?;

        if status != StatusCode::OK {
            error!("Transcription HTTP error {}: {}", status.as_u16(), body);
            return Err(TranscriptionError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let result = self.interpret_body(&body);
        match &result {
            Ok(text) => info!("Transcription received ({} chars)", text.chars().count()),
            Err(e) => warn!("Transcription response rejected: {}", e),
        }
        result
    }
}
