//! Recording session management
//!
//! This module provides the `RecordingSession` state machine that manages:
//! - The capture device lifecycle (start, pause, resume, stop, release)
//! - The live amplitude meter while recording
//! - Handing the finished file to the transcriber
//! - Delivering the transcript to the edit context and history

mod config;
mod session;
mod sinks;
mod state;
mod stats;

pub use config::SessionConfig;
pub use session::RecordingSession;
pub use sinks::{HistoryEntry, HistoryStore, MemoryHistory, StdoutInserter, TextInserter};
pub use state::{SessionError, SessionEvent, SessionState};
pub use stats::{format_elapsed, SessionSnapshot};
