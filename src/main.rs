use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use voice_memo::{
    format_elapsed, Config, MemoryHistory, QualityPreset, RecordingSession, ReplayDevice,
    SessionError, SessionEvent, StdoutInserter, WhisperClient,
};

/// Record a short voice memo and print its transcription
#[derive(Debug, Parser)]
#[command(name = "voice-memo", version)]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voice-memo")]
    config: String,

    /// WAV file replayed as the microphone
    #[arg(long)]
    source: PathBuf,

    /// Recorded seconds before finishing
    #[arg(long, default_value_t = 5)]
    seconds: u64,

    /// low, medium or high; overrides the config file
    #[arg(long)]
    quality: Option<QualityPreset>,

    /// Pause for one second once this many seconds are recorded
    #[arg(long)]
    pause_after: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(quality) = args.quality {
        cfg.recording.quality = quality;
    }

    info!("Voice Memo v{}", env!("CARGO_PKG_VERSION"));
    info!("Quality: {}", cfg.recording.quality);
    info!(
        "Endpoint: {}",
        if cfg.transcription.endpoint.is_empty() { "EMPTY" } else { cfg.transcription.endpoint.as_str() }
    );

    let client = WhisperClient::new().with_timeout(cfg.request_timeout());
    let (mut session, events) = RecordingSession::new(
        cfg.session_config(),
        Arc::new(ReplayDevice::new(&args.source)),
        Arc::new(client),
        Arc::new(StdoutInserter),
        Arc::new(MemoryHistory::new()),
    );
    let event_log = tokio::spawn(log_events(events));

    session.start().await?;

    let recorded = tokio::select! {
        r = record(&mut session, args.seconds, args.pause_after) => Some(r),
        _ = tokio::signal::ctrl_c() => None,
    };
    match recorded {
        Some(r) => r?,
        None => {
            warn!("Interrupted, discarding recording");
            session.teardown().await;
            return Ok(());
        }
    }

    session.finish().await?;

    let outcome = tokio::select! {
        r = session.completion() => Some(r?),
        _ = tokio::signal::ctrl_c() => None,
    };

    if outcome.is_none() {
        session.teardown().await;
    }

    drop(session);
    if let Err(e) = event_log.await {
        error!("Event logger panicked: {}", e);
    }

    match outcome {
        None => {
            warn!("Interrupted, transcription abandoned");
            Ok(())
        }
        Some(Ok(_)) => Ok(()),
        Some(Err(e)) => anyhow::bail!("Transcription failed: {}", e),
    }
}

async fn record(
    session: &mut RecordingSession,
    seconds: u64,
    pause_after: Option<u64>,
) -> Result<(), SessionError> {
    let target = Duration::from_secs(seconds);
    let mut pending_pause = pause_after.map(Duration::from_secs);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    while session.elapsed() < target {
        ticker.tick().await;
        info!("Recording... {}", format_elapsed(session.elapsed()));

        if pending_pause.is_some_and(|at| session.elapsed() >= at) {
            pending_pause = None;
            session.pause().await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
            session.resume().await?;
        }
    }

    Ok(())
}

async fn log_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Level(sample) => debug!(
                "Level {:>3} {:?} {}",
                sample.width,
                sample.band,
                sample.color.hex()
            ),
            SessionEvent::Started { session_id } => info!("Recording started ({})", session_id),
            SessionEvent::Paused { elapsed } => info!("Paused at {}", format_elapsed(elapsed)),
            SessionEvent::Resumed => info!("Resumed"),
            SessionEvent::Cancelled => info!("Recording cancelled"),
            SessionEvent::Finishing { audio_file } => {
                info!("Processing {}", audio_file.display())
            }
            SessionEvent::Transcribed { text, inserted } => {
                info!("Transcribed {} chars (inserted: {})", text.chars().count(), inserted)
            }
            SessionEvent::TranscriptionFailed(e) => error!("Transcription failed: {}", e),
            SessionEvent::DeviceFailed(e) => error!("Recording error: {}", e),
        }
    }
}
