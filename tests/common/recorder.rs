//! Callback that records every invocation for later assertions

use reqflow::{Error, RequestCallback, ResponseInfo};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One observed callback invocation
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Start,
    Loading { total: u64, current: u64 },
    Success(ResponseInfo),
    Failure { code: &'static str, message: String },
    Cancelled,
}

/// Records callbacks in the order the executor delivered them
///
/// Clones share the same log, so the test keeps one clone while the
/// executor consumes the other.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    progress: Option<bool>,
    rate: Option<Duration>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that asks for every progress update (no throttling)
    pub fn unthrottled() -> Self {
        Self {
            rate: Some(Duration::ZERO),
            ..Self::default()
        }
    }

    /// Recorder that opts out of progress updates
    pub fn without_progress() -> Self {
        Self {
            progress: Some(false),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Progress updates as `(total, current)` pairs
    pub fn loading(&self) -> Vec<(u64, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Loading { total, current } => Some((total, current)),
                _ => None,
            })
            .collect()
    }

    /// Number of terminal callbacks (success, failure or cancelled)
    pub fn terminal_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::Success(_) | Call::Failure { .. } | Call::Cancelled
                )
            })
            .count()
    }

    /// Assert `on_start` first, only `on_loading` in between, one terminal call last
    pub fn assert_lifecycle_order(&self) {
        let calls = self.calls();
        assert!(calls.len() >= 2, "expected at least start and a terminal call: {calls:?}");
        assert_eq!(calls[0], Call::Start, "first call must be start: {calls:?}");

        let (last, middle) = calls[1..].split_last().unwrap();
        assert!(
            matches!(last, Call::Success(_) | Call::Failure { .. }),
            "last call must be terminal: {calls:?}"
        );
        assert!(
            middle.iter().all(|call| matches!(call, Call::Loading { .. })),
            "only loading calls may sit between start and the terminal call: {calls:?}"
        );
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RequestCallback for Recorder {
    fn on_start(&mut self) {
        self.push(Call::Start);
    }

    fn on_loading(&mut self, total: u64, current: u64) {
        self.push(Call::Loading { total, current });
    }

    fn on_success(&mut self, result: ResponseInfo) {
        self.push(Call::Success(result));
    }

    fn on_failure(&mut self, error: Error, message: String) {
        assert_eq!(error.to_string(), message);
        self.push(Call::Failure {
            code: error.error_code(),
            message,
        });
    }

    fn on_cancelled(&mut self) {
        self.push(Call::Cancelled);
    }

    fn is_progress(&self) -> bool {
        self.progress.unwrap_or(true)
    }

    fn rate(&self) -> Option<Duration> {
        self.rate
    }
}
