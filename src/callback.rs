//! Caller callbacks and ordered event delivery
//!
//! The worker never calls the caller's callback directly. It posts
//! [`TaskEvent`]s into an unbounded channel with exactly one consumer, the
//! delivery task, which invokes the callback in emission order:
//! `on_start` once, `on_loading` zero or more times, then exactly one of
//! `on_success` / `on_failure`. Once `stop()` has been observed, every
//! further event is dropped and `on_cancelled` fires instead of a terminal
//! callback.

use crate::error::{Error, ErrorDetail};
use crate::throttle::ProgressThrottle;
use crate::types::{ResponseInfo, TaskEvent, TaskOutcome};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle observer supplied by the caller
///
/// Methods run on the delivery task, one at a time, never concurrently.
pub trait RequestCallback: Send + 'static {
    /// Execution started; fires before any network attempt
    fn on_start(&mut self) {}

    /// Progress: `current` of `total` bytes (total is 0 when unknown)
    fn on_loading(&mut self, _total: u64, _current: u64) {}

    /// Terminal success
    fn on_success(&mut self, result: ResponseInfo);

    /// Terminal failure with the error and its message
    fn on_failure(&mut self, error: Error, message: String);

    /// Execution ended by `stop()` before a terminal callback fired
    fn on_cancelled(&mut self) {}

    /// Whether `on_loading` should fire at all (default: true)
    fn is_progress(&self) -> bool {
        true
    }

    /// Minimum time between `on_loading` calls (None = configured default)
    fn rate(&self) -> Option<Duration> {
        None
    }
}

/// Progress settings captured from the callback before it moves to the delivery task
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProgressSettings {
    pub(crate) enabled: bool,
    pub(crate) rate: Duration,
}

impl ProgressSettings {
    pub(crate) fn from_callback<C: RequestCallback>(callback: &C, default_rate: Duration) -> Self {
        Self {
            enabled: callback.is_progress(),
            rate: callback.rate().unwrap_or(default_rate),
        }
    }
}

/// Sending half of the event channel, held by the worker
#[derive(Clone, Debug)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn send(&self, event: TaskEvent) {
        // Receiver gone means the caller dropped interest; nothing to report to
        self.tx.send(event).ok();
    }
}

/// Gates loading events for one execution
///
/// Handlers call [`ProgressReporter::update`] after each chunk; a `false`
/// return means the execution was stopped and streaming should end.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    sink: EventSink,
    throttle: ProgressThrottle,
    enabled: bool,
    stop: CancellationToken,
}

impl ProgressReporter {
    pub(crate) fn new(
        sink: EventSink,
        settings: ProgressSettings,
        stop: CancellationToken,
    ) -> Self {
        Self {
            sink,
            throttle: ProgressThrottle::new(settings.rate),
            enabled: settings.enabled,
            stop,
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub(crate) fn update(&mut self, total: u64, current: u64, force: bool) -> bool {
        if self.is_stopped() {
            return false;
        }
        if self.enabled && self.throttle.admit(force) {
            self.sink.send(TaskEvent::Loading { total, current });
        }
        true
    }
}

/// Consume events in order and drive the callback; returns the observed outcome
pub(crate) async fn deliver<C: RequestCallback>(
    mut events: mpsc::UnboundedReceiver<TaskEvent>,
    mut callback: C,
    stop: CancellationToken,
) -> TaskOutcome {
    let mut outcome = None;

    loop {
        let event = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            TaskEvent::Started => callback.on_start(),
            TaskEvent::Loading { total, current } => callback.on_loading(total, current),
            TaskEvent::Success(info) => {
                outcome = Some(TaskOutcome::Success(info.clone()));
                callback.on_success(info);
                break;
            }
            TaskEvent::Failure(error) => {
                let detail = ErrorDetail::from(&error);
                let message = detail.message.clone();
                outcome = Some(TaskOutcome::Failure(detail));
                callback.on_failure(error, message);
                break;
            }
            TaskEvent::Cancelled => break,
        }
    }

    match outcome {
        Some(outcome) => outcome,
        None if stop.is_cancelled() => {
            callback.on_cancelled();
            TaskOutcome::Cancelled
        }
        None => {
            // Worker ended without a terminal event (it panicked)
            let error = Error::Other("request task ended without a result".to_string());
            let detail = ErrorDetail::from(&error);
            let message = detail.message.clone();
            callback.on_failure(error, message);
            TaskOutcome::Failure(detail)
        }
    }
}
