use crate::audio::AudioQuality;
use crate::transcription::TranscriptionSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a recording session
///
/// Passed in at construction; the session never reads settings from anywhere
/// else and never changes them mid-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capture settings handed to the device on every start
    pub quality: AudioQuality,

    /// Directory the device writes recordings into
    pub output_dir: PathBuf,

    /// Speech-to-text endpoint and credentials
    pub transcription: TranscriptionSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quality: AudioQuality::default(), // 16kHz mono
            output_dir: std::env::temp_dir().join("voice-memo"),
            transcription: TranscriptionSettings::default(),
        }
    }
}
