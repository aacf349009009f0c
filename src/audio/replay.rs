use super::device::{AudioQuality, CaptureDevice};
use super::file::{write_wav, AudioFile};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Window the peak reading looks back over
const PEAK_WINDOW: Duration = Duration::from_millis(100);

/// Capture device that plays a WAV file back in real time
///
/// Recording advances through the source at wall-clock pace while un-paused;
/// `stop()` writes everything "heard" so far to a new WAV under the output
/// directory. Useful for demos and for exercising a session without a
/// microphone.
pub struct ReplayDevice {
    source: PathBuf,
    capture: Mutex<Option<Capture>>,
}

struct Capture {
    audio: Arc<AudioFile>,
    output_path: PathBuf,
    /// Un-paused time accumulated before the current run
    played: Duration,
    /// Set while running, cleared while paused
    running_since: Option<Instant>,
}

impl Capture {
    fn position(&self) -> Duration {
        let running = self
            .running_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        self.played + running
    }

    /// Index one past the last captured sample, aligned to whole frames
    fn cursor(&self) -> usize {
        samples_at(&self.audio, self.position())
    }
}

fn samples_at(audio: &AudioFile, offset: Duration) -> usize {
    let channels = audio.channels.max(1) as usize;
    let frames = (offset.as_micros() * audio.sample_rate as u128 / 1_000_000) as usize;
    (frames * channels).min(audio.samples.len() / channels * channels)
}

impl ReplayDevice {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            capture: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Capture>> {
        self.capture.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ReplayDevice {
    async fn start(&self, output_dir: &Path, quality: AudioQuality) -> Result<()> {
        if self.lock().is_some() {
            anyhow::bail!("Replay device is already recording");
        }

        let source = self.source.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(source))
            .await
            .context("Audio loader task panicked")??;

        if audio.sample_rate != quality.sample_rate_hz || audio.channels != quality.channels {
            warn!(
                "Replay source is {}Hz/{}ch, requested {}Hz/{}ch; keeping source format",
                audio.sample_rate, audio.channels, quality.sample_rate_hz, quality.channels
            );
        }

        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

        let output_path = output_dir.join(format!("memo-{}.wav", uuid::Uuid::new_v4()));

        let mut capture = self.lock();
        if capture.is_some() {
            anyhow::bail!("Replay device is already recording");
        }
        *capture = Some(Capture {
            audio: Arc::new(audio),
            output_path,
            played: Duration::ZERO,
            running_since: Some(Instant::now()),
        });

        info!("Replay capture started from {}", self.source.display());
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut guard = self.lock();
        let capture = guard.as_mut().context("Replay device is not recording")?;
        match capture.running_since.take() {
            Some(since) => {
                capture.played += since.elapsed();
                Ok(())
            }
            None => anyhow::bail!("Replay device is already paused"),
        }
    }

    async fn resume(&self) -> Result<()> {
        let mut guard = self.lock();
        let capture = guard.as_mut().context("Replay device is not recording")?;
        if capture.running_since.is_some() {
            anyhow::bail!("Replay device is not paused");
        }
        capture.running_since = Some(Instant::now());
        Ok(())
    }

    async fn stop(&self) -> Result<PathBuf> {
        let capture = self.lock().take().context("Replay device is not recording")?;
        let cursor = capture.cursor();

        let audio = Arc::clone(&capture.audio);
        let path = capture.output_path.clone();
        let written = tokio::task::spawn_blocking(move || {
            write_wav(&path, audio.sample_rate, audio.channels, &audio.samples[..cursor])
        })
        .await
        .context("WAV writer task panicked")
        .and_then(|r| r);

        if let Err(e) = written {
            discard(&capture.output_path).await;
            return Err(e);
        }

        info!(
            "Replay capture stopped: {:.1}s written to {}",
            cursor as f64 / capture.audio.samples_per_second().max(1) as f64,
            capture.output_path.display()
        );

        Ok(capture.output_path)
    }

    fn peak_amplitude(&self) -> i16 {
        let guard = self.lock();
        let Some(capture) = guard.as_ref() else {
            return 0;
        };

        let end = capture.cursor();
        let start = samples_at(&capture.audio, capture.position().saturating_sub(PEAK_WINDOW));

        capture.audio.samples[start..end]
            .iter()
            .map(|&s| (s as i32).abs().min(i16::MAX as i32))
            .max()
            .unwrap_or(0) as i16
    }

    async fn release(&self) {
        let taken = self.lock().take();
        let Some(capture) = taken else {
            return;
        };

        discard(&capture.output_path).await;
        info!("Replay capture released");
    }

    fn name(&self) -> &str {
        "wav-replay"
    }
}

/// Remove a partially written capture, if any
async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => warn!("Discarded partial capture {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to discard {}: {}", path.display(), e),
    }
}
