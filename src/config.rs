use crate::audio::QualityPreset;
use crate::session::SessionConfig;
use crate::transcription::{
    TranscriptionSettings, DEFAULT_MODEL, DEFAULT_RESPONSE_FORMAT, DEFAULT_TIMEOUT,
};
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `VOICE_MEMO_TRANSCRIPTION__API_KEY`
pub const ENV_PREFIX: &str = "VOICE_MEMO";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub recording: RecordingConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub response_format: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            response_format: DEFAULT_RESPONSE_FORMAT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "EMPTY" } else { "SET" })
            .field("model", &self.model)
            .field("response_format", &self.response_format)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub quality: QualityPreset,
    /// Defaults to `<temp>/voice-memo`
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Load `path` (any extension the config crate knows, optional) with
    /// `VOICE_MEMO_*` environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription.timeout_secs)
    }

    /// Explicit settings for one session
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();

        SessionConfig {
            quality: self.recording.quality.quality(),
            output_dir: self
                .recording
                .output_dir
                .clone()
                .unwrap_or(defaults.output_dir),
            transcription: TranscriptionSettings {
                endpoint: self.transcription.endpoint.clone(),
                api_key: self.transcription.api_key.clone(),
                model: self.transcription.model.clone(),
                response_format: self.transcription.response_format.clone(),
            },
        }
    }
}
