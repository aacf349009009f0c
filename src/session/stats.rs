use super::state::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Point-in-time view of a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current lifecycle state
    pub state: SessionState,

    /// Id of the current attempt, `None` while idle
    pub session_id: Option<Uuid>,

    /// When the current attempt started
    pub started_at: Option<DateTime<Utc>>,

    /// Recorded time so far, paused time excluded
    pub elapsed_ms: u64,
}

/// `MM:SS` for a recording timer
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
