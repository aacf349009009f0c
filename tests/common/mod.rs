// Shared fixtures for the integration tests: a scripted capture device, a
// scripted transcriber, recording sinks, a fake transcription endpoint and a
// small multipart decoder.

#![allow(dead_code)]

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use voice_memo::{
    AudioQuality, CaptureDevice, HistoryStore, MemoryHistory, RecordingSession, SessionConfig,
    SessionEvent, TextInserter, Transcriber, TranscriptionRequest, TranscriptionResult,
    TranscriptionSettings,
};

// ============================================================================
// Capture device
// ============================================================================

/// Device that records calls and writes a small file on stop
#[derive(Default)]
pub struct ScriptedDevice {
    pub calls: Mutex<Vec<&'static str>>,
    pub amplitude: AtomicI16,
    pub peak_reads: AtomicUsize,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_pause: AtomicBool,
    output_dir: Mutex<Option<PathBuf>>,
}

impl ScriptedDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn released(&self) -> bool {
        self.calls().contains(&"release")
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn start(&self, output_dir: &Path, _quality: AudioQuality) -> Result<()> {
        self.record("start");
        if self.fail_start.load(Ordering::SeqCst) {
            anyhow::bail!("microphone busy");
        }
        *self.output_dir.lock().unwrap() = Some(output_dir.to_path_buf());
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause");
        if self.fail_pause.load(Ordering::SeqCst) {
            anyhow::bail!("pause not supported");
        }
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume");
        Ok(())
    }

    async fn stop(&self) -> Result<PathBuf> {
        self.record("stop");
        if self.fail_stop.load(Ordering::SeqCst) {
            anyhow::bail!("recorder stopped unexpectedly");
        }
        let dir = self
            .output_dir
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("not started"))?;
        let path = dir.join(format!("memo-{}.m4a", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"fake m4a bytes")?;
        Ok(path)
    }

    fn peak_amplitude(&self) -> i16 {
        self.peak_reads.fetch_add(1, Ordering::SeqCst);
        self.amplitude.load(Ordering::SeqCst)
    }

    async fn release(&self) {
        self.record("release");
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Transcriber
// ============================================================================

/// Transcriber returning a fixed result, optionally held until `open_gate()`
pub struct ScriptedTranscriber {
    result: TranscriptionResult,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<TranscriptionRequest>>,
    gated: bool,
    gate: Notify,
}

impl ScriptedTranscriber {
    pub fn returning(result: TranscriptionResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gated: false,
            gate: Notify::new(),
        })
    }

    /// Holds every upload until `open_gate()` is called
    pub fn gated(result: TranscriptionResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gated: true,
            gate: Notify::new(),
        })
    }

    pub fn open_gate(&self) {
        self.gate.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, request: TranscriptionRequest) -> TranscriptionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if self.gated {
            self.gate.notified().await;
        }
        self.result.clone()
    }
}

// ============================================================================
// Sinks
// ============================================================================

pub struct RecordingInserter {
    accept: bool,
    pub inserted: Mutex<Vec<String>>,
}

impl RecordingInserter {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            accept: true,
            inserted: Mutex::new(Vec::new()),
        })
    }

    /// No edit context: every insert is refused
    pub fn detached() -> Arc<Self> {
        Arc::new(Self {
            accept: false,
            inserted: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.inserted.lock().unwrap().clone()
    }
}

impl TextInserter for RecordingInserter {
    fn insert(&self, text: &str) -> bool {
        if self.accept {
            self.inserted.lock().unwrap().push(text.to_string());
        }
        self.accept
    }
}

// ============================================================================
// Session harness
// ============================================================================

pub struct Harness {
    pub session: RecordingSession,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub device: Arc<ScriptedDevice>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub inserter: Arc<RecordingInserter>,
    pub history: Arc<MemoryHistory>,
    pub output_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(transcriber: Arc<ScriptedTranscriber>) -> Self {
        Self::with_inserter(transcriber, RecordingInserter::accepting())
    }

    pub fn with_inserter(
        transcriber: Arc<ScriptedTranscriber>,
        inserter: Arc<RecordingInserter>,
    ) -> Self {
        let output_dir = tempfile::TempDir::new().unwrap();
        let device = ScriptedDevice::new();
        let history = Arc::new(MemoryHistory::new());

        let config = SessionConfig {
            output_dir: output_dir.path().to_path_buf(),
            transcription: TranscriptionSettings::new("http://stt.invalid/v1", "sk-test"),
            ..SessionConfig::default()
        };

        let (session, events) = RecordingSession::new(
            config,
            device.clone(),
            transcriber.clone(),
            inserter.clone(),
            history.clone() as Arc<dyn HistoryStore>,
        );

        Self {
            session,
            events,
            device,
            transcriber,
            inserter,
            history,
            output_dir,
        }
    }

    /// Drain queued events, leaving out amplitude readings
    pub fn lifecycle_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if !matches!(event, SessionEvent::Level(_)) {
                out.push(event);
            }
        }
        out
    }

    /// Count queued amplitude readings, dropping everything else
    pub fn level_count(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events.try_recv() {
            if matches!(event, SessionEvent::Level(_)) {
                count += 1;
            }
        }
        count
    }

    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.output_dir.path()).unwrap().count()
    }
}

// ============================================================================
// Fake transcription endpoint
// ============================================================================

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct FakeState {
    status: StatusCode,
    body: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct FakeServer {
    pub url: String,
    pub captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl FakeServer {
    /// Serve `status` + `body` for every POST to `/v1/audio/transcriptions`
    pub async fn start(status: u16, body: &str) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            captured: captured.clone(),
        };

        let app = Router::new()
            .route("/v1/audio/transcriptions", post(handle_transcription))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/v1/audio/transcriptions", addr),
            captured,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

async fn handle_transcription(
    State(state): State<FakeState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> (StatusCode, String) {
    state.captured.lock().unwrap().push(CapturedRequest {
        headers,
        body: body.to_vec(),
    });
    (state.status, state.body.clone())
}

/// URL of a listener that reads every request but never answers
pub async fn stalled_server_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });
    format!("http://{}/v1/audio/transcriptions", addr)
}

/// URL on localhost where nothing is listening
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1/audio/transcriptions", addr)
}

// ============================================================================
// Multipart decoding
// ============================================================================

#[derive(Debug, Clone)]
pub struct DecodedPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn header_param(line: &str, param: &str) -> Option<String> {
    let key = format!("{}=\"", param);
    let start = line.find(&key)? + key.len();
    let end = start + line[start..].find('"')?;
    Some(line[start..end].to_string())
}

/// Split a multipart/form-data body into its parts
pub fn decode_multipart(body: &[u8], boundary: &str) -> Vec<DecodedPart> {
    let delimiter = format!("\r\n--{}", boundary).into_bytes();
    let opening = format!("--{}\r\n", boundary).into_bytes();
    assert!(body.starts_with(&opening), "body must open with the boundary");

    let mut parts = Vec::new();
    let mut cursor = opening.len();

    loop {
        let header_end = find(body, b"\r\n\r\n", cursor).expect("part headers end");
        let headers = std::str::from_utf8(&body[cursor..header_end]).unwrap();
        let data_start = header_end + 4;
        let data_end = find(body, &delimiter, data_start).expect("part closing boundary");

        let mut part = DecodedPart {
            name: String::new(),
            filename: None,
            content_type: None,
            data: body[data_start..data_end].to_vec(),
        };
        for line in headers.split("\r\n") {
            if line.starts_with("Content-Disposition:") {
                part.name = header_param(line, "name").unwrap_or_default();
                part.filename = header_param(line, "filename");
            } else if let Some(ct) = line.strip_prefix("Content-Type: ") {
                part.content_type = Some(ct.to_string());
            }
        }
        parts.push(part);

        let after = data_end + delimiter.len();
        if body[after..].starts_with(b"--\r\n") {
            assert_eq!(after + 4, body.len(), "nothing may follow the closing boundary");
            break;
        }
        assert!(body[after..].starts_with(b"\r\n"), "boundary must end its line");
        cursor = after + 2;
    }

    parts
}

/// `boundary=` parameter of a multipart Content-Type value
pub fn boundary_of(content_type: &str) -> String {
    content_type
        .split("boundary=")
        .nth(1)
        .expect("boundary parameter")
        .to_string()
}
