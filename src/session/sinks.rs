//! Where a finished transcription goes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// Delivers text into the caller's active edit context
pub trait TextInserter: Send + Sync {
    /// Returns false when there is no edit context to receive the text
    fn insert(&self, text: &str) -> bool;
}

/// Fire-and-forget record of successful transcriptions
pub trait HistoryStore: Send + Sync {
    fn append(&self, text: &str);
}

/// Writes the text to stdout; always accepted
#[derive(Debug, Default)]
pub struct StdoutInserter;

impl TextInserter for StdoutInserter {
    fn insert(&self, text: &str) -> bool {
        println!("{}", text);
        true
    }
}

/// One saved transcription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub saved_at: DateTime<Utc>,
    pub text: String,
}

/// Keeps history entries in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries oldest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.text).collect()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, text: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(HistoryEntry {
            saved_at: Utc::now(),
            text: text.to_string(),
        });
        info!("History entry saved ({} total)", entries.len());
    }
}
