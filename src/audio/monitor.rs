use super::device::CaptureDevice;
use super::level::AmplitudeSample;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Cadence of the level meter (10 updates per second)
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(100);

/// Polls the device peak while a session is recording
///
/// The loop lives on its own task and delivers every reading through `sink`.
/// `stop()` cancels it and waits for the task to exit, so once it returns no
/// further sample can be sent. Dropping the monitor cancels it without
/// waiting.
pub struct AmplitudeMonitor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AmplitudeMonitor {
    /// Start sampling `device` every `SAMPLE_PERIOD`, first reading immediately
    pub fn start<F>(device: Arc<dyn CaptureDevice>, sink: F) -> Self
    where
        F: Fn(AmplitudeSample) + Send + 'static,
    {
        Self::start_with_period(device, SAMPLE_PERIOD, sink)
    }

    pub fn start_with_period<F>(device: Arc<dyn CaptureDevice>, period: Duration, sink: F) -> Self
    where
        F: Fn(AmplitudeSample) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            debug!("Amplitude monitor started ({}ms)", period.as_millis());

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // A pending tick must not outlive cancellation
                        if token.is_cancelled() {
                            break;
                        }
                        sink(AmplitudeSample::from_raw(device.peak_amplitude()));
                    }
                }
            }

            debug!("Amplitude monitor stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel the loop and wait until it has exited
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Amplitude monitor task panicked: {}", e);
            }
        }
    }
}

impl Drop for AmplitudeMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Sink that forwards samples into an unbounded channel, ignoring a closed receiver
pub fn channel_sink<T, F>(tx: mpsc::UnboundedSender<T>, wrap: F) -> impl Fn(AmplitudeSample) + Send + 'static
where
    T: Send + 'static,
    F: Fn(AmplitudeSample) -> T + Send + 'static,
{
    move |sample| {
        let _ = tx.send(wrap(sample));
    }
}
