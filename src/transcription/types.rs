use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Model requested when the configuration does not name one
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Response format the field extraction expects
pub const DEFAULT_RESPONSE_FORMAT: &str = "json";

/// Endpoint, credentials and model for the speech-to-text service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Full URL of the transcription endpoint
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub response_format: String,
}

impl TranscriptionSettings {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            response_format: DEFAULT_RESPONSE_FORMAT.to_string(),
        }
    }
}

/// One upload of one finished recording
///
/// Built once per finish and consumed by `Transcriber::transcribe`.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio_file: PathBuf,
    pub settings: TranscriptionSettings,
}

impl TranscriptionRequest {
    pub fn new(audio_file: impl Into<PathBuf>, settings: TranscriptionSettings) -> Self {
        Self {
            audio_file: audio_file.into(),
            settings,
        }
    }
}

/// Why a transcription produced no text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptionError {
    /// Endpoint or API key missing; nothing was sent
    #[error("transcription API is not configured")]
    NotConfigured,

    /// Connection-level failure (refused, timeout, DNS, TLS, broken body)
    #[error("network error: {0}")]
    Network(String),

    /// Service answered with a status other than 200
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// 200 response without a readable `text` field
    #[error("could not find transcription text in response")]
    Parse,

    /// 200 response whose `text` field is empty
    #[error("no transcription found")]
    EmptyResult,

    /// The recorded file could not be read for upload
    #[error("could not read recorded audio: {0}")]
    AudioFile(String),
}

pub type TranscriptionResult = Result<String, TranscriptionError>;
