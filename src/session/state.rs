use crate::audio::AmplitudeSample;
use crate::transcription::TranscriptionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Where a session is in its lifecycle
///
/// `Finishing` lasts from device stop until the transcription outcome has been
/// delivered. `Cancelled` and `Errored` are exits that always settle back to
/// `Idle` before the call that entered them returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Finishing,
    Cancelled,
    Errored,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Paused => "paused",
            SessionState::Finishing => "finishing",
            SessionState::Cancelled => "cancelled",
            SessionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Lifecycle notifications for whoever renders the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { session_id: Uuid },
    Paused { elapsed: Duration },
    Resumed,
    /// Live loudness reading, only while recording
    Level(AmplitudeSample),
    Cancelled,
    /// Device stopped, upload in flight
    Finishing { audio_file: PathBuf },
    /// `inserted` is false when there was no edit context to receive the text
    Transcribed { text: String, inserted: bool },
    TranscriptionFailed(TranscriptionError),
    DeviceFailed(String),
}

/// Rejected or failed session operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The capture device failed; the session has already been reset to idle
    #[error("capture device error: {0}")]
    Device(String),
}
