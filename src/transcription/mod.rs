//! Speech-to-text upload
//!
//! - `WhisperClient` posts a finished recording as multipart/form-data
//! - `FieldExtractor` isolates how the transcript is read from the response
//! - failures are classified into `TranscriptionError`

pub mod client;
pub mod extract;
pub mod multipart;
pub mod types;

pub use client::{Transcriber, WhisperClient, DEFAULT_TIMEOUT};
pub use extract::{FieldExtractor, JsonFieldExtractor, ScanExtractor};
pub use multipart::MultipartUpload;
pub use types::{
    TranscriptionError, TranscriptionRequest, TranscriptionResult, TranscriptionSettings,
    DEFAULT_MODEL, DEFAULT_RESPONSE_FORMAT,
};
