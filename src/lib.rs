pub mod audio;
pub mod config;
pub mod session;
pub mod transcription;

pub use audio::{
    AmplitudeMonitor, AmplitudeSample, AudioFile, AudioQuality, CaptureDevice, LevelBand,
    QualityPreset, ReplayDevice,
};
pub use config::Config;
pub use session::{
    format_elapsed, HistoryEntry, HistoryStore, MemoryHistory, RecordingSession, SessionConfig,
    SessionError, SessionEvent, SessionSnapshot, SessionState, StdoutInserter, TextInserter,
};
pub use transcription::{
    FieldExtractor, JsonFieldExtractor, ScanExtractor, Transcriber, TranscriptionError,
    TranscriptionRequest, TranscriptionResult, TranscriptionSettings, WhisperClient,
};
