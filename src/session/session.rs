use super::config::SessionConfig;
use super::sinks::{HistoryStore, TextInserter};
use super::state::{SessionError, SessionEvent, SessionState};
use super::stats::SessionSnapshot;
use crate::audio::monitor::channel_sink;
use crate::audio::{AmplitudeMonitor, CaptureDevice};
use crate::transcription::{Transcriber, TranscriptionError, TranscriptionRequest, TranscriptionResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One voice memo, from `start()` to a delivered transcription
///
/// All transitions take `&mut self`, so the owner's task is the only writer.
/// Device I/O is awaited in place; the upload runs on a spawned task whose
/// outcome is collected by `completion()`. Lifecycle notifications go out on
/// the event channel returned by `new()`.
pub struct RecordingSession {
    /// Session configuration
    config: SessionConfig,

    device: Arc<dyn CaptureDevice>,
    transcriber: Arc<dyn Transcriber>,
    inserter: Arc<dyn TextInserter>,
    history: Arc<dyn HistoryStore>,

    events: mpsc::UnboundedSender<SessionEvent>,

    phase: Phase,

    /// Recorded time from runs before the current one
    accumulated: Duration,

    /// Set from `start()` until the session is back to idle
    attempt: Option<Attempt>,
}

enum Phase {
    Idle,
    Recording {
        resumed_at: Instant,
        monitor: AmplitudeMonitor,
    },
    Paused,
    Finishing(Upload),
    Cancelled,
    Errored,
}

impl Phase {
    fn state(&self) -> SessionState {
        match self {
            Phase::Idle => SessionState::Idle,
            Phase::Recording { .. } => SessionState::Recording,
            Phase::Paused => SessionState::Paused,
            Phase::Finishing(_) => SessionState::Finishing,
            Phase::Cancelled => SessionState::Cancelled,
            Phase::Errored => SessionState::Errored,
        }
    }
}

struct Upload {
    task: JoinHandle<TranscriptionResult>,
    audio_file: PathBuf,
}

#[derive(Clone, Copy)]
struct Attempt {
    id: Uuid,
    started_at: DateTime<Utc>,
}

impl RecordingSession {
    /// Create an idle session and the receiver for its events
    pub fn new(
        config: SessionConfig,
        device: Arc<dyn CaptureDevice>,
        transcriber: Arc<dyn Transcriber>,
        inserter: Arc<dyn TextInserter>,
        history: Arc<dyn HistoryStore>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();

        info!("Creating recording session with device: {}", device.name());

        let session = Self {
            config,
            device,
            transcriber,
            inserter,
            history,
            events,
            phase: Phase::Idle,
            accumulated: Duration::ZERO,
            attempt: None,
        };

        (session, events_rx)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    /// Recorded time so far, paused time excluded
    pub fn elapsed(&self) -> Duration {
        match &self.phase {
            Phase::Recording { resumed_at, .. } => self.accumulated + resumed_at.elapsed(),
            _ => self.accumulated,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            session_id: self.attempt.map(|a| a.id),
            started_at: self.attempt.map(|a| a.started_at),
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }

    /// Open the device and begin recording
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.require("start", &[SessionState::Idle])?;

        let attempt = Attempt {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        info!("Starting recording session: {}", attempt.id);

        self.attempt = Some(attempt);
        self.accumulated = Duration::ZERO;

        let started = self
            .device
            .start(&self.config.output_dir, self.config.quality)
            .await;
        if let Err(e) = started {
            return Err(self.fail_device("start", e).await);
        }

        self.phase = Phase::Recording {
            resumed_at: Instant::now(),
            monitor: self.spawn_monitor(),
        };
        self.emit(SessionEvent::Started {
            session_id: attempt.id,
        });

        info!("Recording session started successfully");
        Ok(())
    }

    /// Suspend recording; the level meter stops and the timer freezes
    pub async fn pause(&mut self) -> Result<(), SessionError> {
        self.require("pause", &[SessionState::Recording])?;
        self.halt_recording(Phase::Paused).await;

        let paused = self.device.pause().await;
        if let Err(e) = paused {
            return Err(self.fail_device("pause", e).await);
        }

        info!("Recording paused at {:?}", self.accumulated);
        self.emit(SessionEvent::Paused {
            elapsed: self.accumulated,
        });
        Ok(())
    }

    /// Continue a paused recording into the same file
    pub async fn resume(&mut self) -> Result<(), SessionError> {
        self.require("resume", &[SessionState::Paused])?;

        let resumed = self.device.resume().await;
        if let Err(e) = resumed {
            return Err(self.fail_device("resume", e).await);
        }

        self.phase = Phase::Recording {
            resumed_at: Instant::now(),
            monitor: self.spawn_monitor(),
        };

        info!("Recording resumed");
        self.emit(SessionEvent::Resumed);
        Ok(())
    }

    /// Discard the recording without transcribing it
    pub async fn cancel(&mut self) -> Result<(), SessionError> {
        self.require("cancel", &[SessionState::Recording, SessionState::Paused])?;
        self.discard_recording().await;
        info!("Recording cancelled");
        Ok(())
    }

    /// Stop the device and hand the file to the transcriber
    ///
    /// Returns once the upload has been dispatched. The outcome is NOT
    /// delivered on its own: the owner must await `completion()` (or use
    /// `finish_and_wait()`), which inserts the text, writes history, emits
    /// `Transcribed` / `TranscriptionFailed` and deletes the audio file.
    /// Until then the session stays in `Finishing` and every other
    /// transition is rejected; listening on the event channel alone is not
    /// enough.
    pub async fn finish(&mut self) -> Result<(), SessionError> {
        self.require("finish", &[SessionState::Recording, SessionState::Paused])?;
        self.halt_recording(Phase::Paused).await;

        let stopped = self.device.stop().await;
        let audio_file = match stopped {
            Ok(path) => path,
            Err(e) => return Err(self.fail_device("stop", e).await),
        };

        info!(
            "Recording stopped after {:?}, uploading {}",
            self.accumulated,
            audio_file.display()
        );

        let request = TranscriptionRequest::new(audio_file.clone(), self.config.transcription.clone());
        let transcriber = Arc::clone(&self.transcriber);
        let task = tokio::spawn(async move { transcriber.transcribe(request).await });

        self.phase = Phase::Finishing(Upload {
            task,
            audio_file: audio_file.clone(),
        });
        self.emit(SessionEvent::Finishing { audio_file });
        Ok(())
    }

    /// Wait for the in-flight upload, deliver its outcome, and return to idle
    ///
    /// The only place a transcription result is delivered.
    /// Cancel safe: dropping the future leaves the upload running and the
    /// session in `Finishing`.
    pub async fn completion(&mut self) -> Result<TranscriptionResult, SessionError> {
        self.require("await transcription", &[SessionState::Finishing])?;

        let joined = match &mut self.phase {
            Phase::Finishing(upload) => (&mut upload.task).await,
            _ => unreachable!("state checked above"),
        };

        let result = joined.unwrap_or_else(|e| {
            error!("Transcription task failed: {}", e);
            Err(TranscriptionError::Network(format!("transcription task failed: {}", e)))
        });

        let Phase::Finishing(upload) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            unreachable!("state checked above");
        };

        self.deliver(&result);
        remove_audio(&upload.audio_file).await;
        self.reset();

        Ok(result)
    }

    /// `finish()` followed by `completion()`
    pub async fn finish_and_wait(&mut self) -> Result<TranscriptionResult, SessionError> {
        self.finish().await?;
        self.completion().await
    }

    /// Host went away (input closed, window hidden): drop everything quietly
    ///
    /// A recording is discarded as with `cancel()`. An upload in flight is
    /// aborted and its result is never delivered. Idle is a no-op.
    pub async fn teardown(&mut self) {
        match self.state() {
            SessionState::Recording | SessionState::Paused => {
                info!("Host teardown while recording");
                self.discard_recording().await;
            }
            SessionState::Finishing => {
                info!("Host teardown during upload, abandoning transcription");
                if let Phase::Finishing(upload) = std::mem::replace(&mut self.phase, Phase::Cancelled) {
                    upload.task.abort();
                    remove_audio(&upload.audio_file).await;
                }
                self.reset();
            }
            _ => {}
        }
    }

    /// Asynchronous failure reported by the capture device
    pub async fn report_device_error(&mut self, message: impl Into<String>) {
        let err = anyhow::anyhow!(message.into());
        self.fail_device("record", err).await;
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            warn!("Rejected {} while {}", operation, state);
            Err(SessionError::InvalidState { operation, state })
        }
    }

    fn spawn_monitor(&self) -> AmplitudeMonitor {
        AmplitudeMonitor::start(
            Arc::clone(&self.device),
            channel_sink(self.events.clone(), SessionEvent::Level),
        )
    }

    /// Leave `Recording` for `next`, stopping the meter and banking the run time
    ///
    /// From any other phase this is a no-op.
    async fn halt_recording(&mut self, next: Phase) {
        if !matches!(self.phase, Phase::Recording { .. }) {
            return;
        }
        if let Phase::Recording { resumed_at, monitor } = std::mem::replace(&mut self.phase, next) {
            self.accumulated += resumed_at.elapsed();
            monitor.stop().await;
        }
    }

    async fn discard_recording(&mut self) {
        self.halt_recording(Phase::Cancelled).await;
        self.phase = Phase::Cancelled;
        self.device.release().await;
        self.emit(SessionEvent::Cancelled);
        self.reset();
    }

    /// Errored exit: release the device, surface the error, settle to idle
    async fn fail_device(&mut self, operation: &str, err: anyhow::Error) -> SessionError {
        let message = format!("{:#}", err);
        error!("Capture device failed to {}: {}", operation, message);

        self.halt_recording(Phase::Errored).await;
        if let Phase::Finishing(upload) = std::mem::replace(&mut self.phase, Phase::Errored) {
            upload.task.abort();
            remove_audio(&upload.audio_file).await;
        }

        self.device.release().await;
        self.emit(SessionEvent::DeviceFailed(message.clone()));
        self.reset();

        SessionError::Device(message)
    }

    fn deliver(&self, result: &TranscriptionResult) {
        match result {
            Ok(text) => {
                let inserted = self.inserter.insert(text);
                if inserted {
                    self.history.append(text);
                } else {
                    warn!("No edit context to receive the transcription");
                }
                self.emit(SessionEvent::Transcribed {
                    text: text.clone(),
                    inserted,
                });
            }
            Err(e) => {
                error!("Transcription failed: {}", e);
                self.emit(SessionEvent::TranscriptionFailed(e.clone()));
            }
        }
    }

    fn reset(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            debug!("Session {} back to idle", attempt.id);
        }
        self.phase = Phase::Idle;
        self.accumulated = Duration::ZERO;
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session event dropped, receiver closed");
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Finishing(upload) => {
                upload.task.abort();
                if let Err(e) = std::fs::remove_file(&upload.audio_file) {
                    warn!("Failed to remove {}: {}", upload.audio_file.display(), e);
                }
            }
            Phase::Recording { .. } | Phase::Paused => {
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let device = Arc::clone(&self.device);
                    runtime.spawn(async move { device.release().await });
                } else {
                    warn!("Session dropped while recording outside a runtime; device not released");
                }
            }
            _ => {}
        }
    }
}

async fn remove_audio(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
