//! Rate limiting for loading events

use std::time::{Duration, Instant};

/// Whether a non-forced progress event may be emitted at `now`
///
/// `last_emit` is the time of the last accepted emission (None if nothing
/// was emitted yet).
pub fn should_emit(now: Instant, last_emit: Option<Instant>, min_interval: Duration) -> bool {
    match last_emit {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= min_interval,
    }
}

/// Tracks the last accepted emission for one executor
#[derive(Clone, Debug)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// Create a throttle allowing one event per `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: None,
        }
    }

    /// Decide whether to emit now; accepted emissions update the timestamp
    ///
    /// Forced emissions always pass.
    pub fn admit(&mut self, force: bool) -> bool {
        self.admit_at(Instant::now(), force)
    }

    pub(crate) fn admit_at(&mut self, now: Instant, force: bool) -> bool {
        if force || should_emit(now, self.last_emit, self.min_interval) {
            self.last_emit = Some(now);
            true
        } else {
            false
        }
    }
}
