use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Capture settings fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQuality {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Encoder bitrate in kbps
    pub bitrate_kbps: u32,
}

impl AudioQuality {
    /// 16kHz mono, 128kbps
    pub const LOW: Self = Self {
        sample_rate_hz: 16000,
        channels: 1,
        bitrate_kbps: 128,
    };

    /// 22kHz mono, 192kbps
    pub const MEDIUM: Self = Self {
        sample_rate_hz: 22050,
        channels: 1,
        bitrate_kbps: 192,
    };

    /// 44kHz stereo, 256kbps
    pub const HIGH: Self = Self {
        sample_rate_hz: 44100,
        channels: 2,
        bitrate_kbps: 256,
    };
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self::LOW
    }
}

/// Named quality preset as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[default]
    Low,
    Medium,
    High,
}

impl QualityPreset {
    pub fn quality(self) -> AudioQuality {
        match self {
            QualityPreset::Low => AudioQuality::LOW,
            QualityPreset::Medium => AudioQuality::MEDIUM,
            QualityPreset::High => AudioQuality::HIGH,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            other => anyhow::bail!("Unknown audio quality '{}' (expected low, medium or high)", other),
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityPreset::Low => "low",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "high",
        };
        f.write_str(name)
    }
}

/// Audio capture device trait
///
/// The recorder is opaque to the session: it encodes to a file on its own and
/// only exposes lifecycle calls plus an instantaneous peak reading.
///
/// Implementations:
/// - `ReplayDevice`: plays a WAV file back as if it were a microphone
/// - platform recorders live outside this crate
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Begin recording into a new file under `output_dir`
    async fn start(&self, output_dir: &Path, quality: AudioQuality) -> Result<()>;

    /// Suspend capture, keeping what has been recorded so far
    async fn pause(&self) -> Result<()>;

    /// Continue a paused capture into the same file
    async fn resume(&self) -> Result<()>;

    /// Stop capturing and hand back the finished file
    async fn stop(&self) -> Result<PathBuf>;

    /// Instantaneous peak reading in `[0, 32767]`; 0 when not recording
    fn peak_amplitude(&self) -> i16;

    /// Stop if needed and discard any partial output
    async fn release(&self);

    /// Get device name for logging
    fn name(&self) -> &str;
}
