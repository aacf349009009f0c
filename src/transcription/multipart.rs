//! multipart/form-data body for the transcription upload
//!
//! Part order is fixed: `model`, `response_format`, then `file`. The audio is
//! streamed from disk in buffer-sized chunks; only the small text preamble
//! and the closing boundary are held in memory.

use futures::stream::{self, Stream, StreamExt};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio_util::bytes::Bytes;
use tokio_util::io::ReaderStream;

const CRLF: &str = "\r\n";
const READ_CHUNK: usize = 4096;

/// Content type announced for an uploaded recording
pub fn audio_content_type(file_name: &str) -> &'static str {
    if file_name.ends_with(".m4a") {
        "audio/mp4"
    } else {
        "audio/mpeg"
    }
}

/// Fresh boundary token, unique per request
pub fn new_boundary() -> String {
    format!("----VoiceMemoBoundary{}", uuid::Uuid::new_v4().simple())
}

/// Upload body: two text fields followed by one file field
pub struct MultipartUpload {
    boundary: String,
    head: Bytes,
    tail: Bytes,
    file: File,
    file_len: u64,
}

impl MultipartUpload {
    /// Open `audio_path` and lay out the parts around it
    pub async fn open(
        audio_path: &Path,
        model: &str,
        response_format: &str,
        boundary: String,
    ) -> io::Result<Self> {
        let file = File::open(audio_path).await?;
        let file_len = file.metadata().await?.len();

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.m4a".to_string());

        let mut head = String::new();
        push_text_part(&mut head, &boundary, "model", model);
        push_text_part(&mut head, &boundary, "response_format", response_format);
        head.push_str(&format!("--{}{}", boundary, CRLF));
        head.push_str(&format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"{}",
            file_name, CRLF
        ));
        head.push_str(&format!("Content-Type: {}{}", audio_content_type(&file_name), CRLF));
        head.push_str(CRLF);

        let tail = format!("{}--{}--{}", CRLF, boundary, CRLF);

        Ok(Self {
            boundary,
            head: Bytes::from(head),
            tail: Bytes::from(tail),
            file,
            file_len,
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact body size in bytes
    pub fn content_length(&self) -> u64 {
        self.head.len() as u64 + self.file_len + self.tail.len() as u64
    }

    /// Body as a chunk stream: preamble, file contents, closing boundary
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let Self { head, tail, file, .. } = self;
        stream::iter([Ok(head)])
            .chain(ReaderStream::with_capacity(file, READ_CHUNK))
            .chain(stream::iter([Ok(tail)]))
    }
}

fn push_text_part(out: &mut String, boundary: &str, name: &str, value: &str) {
    out.push_str(&format!("--{}{}", boundary, CRLF));
    out.push_str(&format!("Content-Disposition: form-data; name=\"{}\"{}", name, CRLF));
    out.push_str(CRLF);
    out.push_str(value);
    out.push_str(CRLF);
}
