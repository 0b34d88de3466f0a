//! Retry decisions for transient failures
//!
//! The executor counts attempts and asks a [`RetryPolicy`] whether to go
//! again. [`DefaultRetryPolicy`] retries a bounded number of times for
//! timeout and connection-class errors, waits with exponential backoff and
//! optional jitter, and refuses to replay non-idempotent requests unless the
//! failure proves the server never saw them.
//!
//! # Example
//!
//! ```
//! use reqflow::config::RetryConfig;
//! use reqflow::retry::{DefaultRetryPolicy, RetryPolicy};
//! use reqflow::{Error, Request};
//!
//! let policy = DefaultRetryPolicy::new(RetryConfig {
//!     max_attempts: 2,
//!     ..RetryConfig::default()
//! });
//! let request = Request::get("http://example.com/").unwrap();
//! let reset = Error::Io(std::io::ErrorKind::ConnectionReset.into());
//!
//! assert!(policy.should_retry(&reset, 1, &request));
//! assert!(policy.should_retry(&reset, 2, &request));
//! assert!(!policy.should_retry(&reset, 3, &request));
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use crate::types::Request;
use rand::Rng;
use reqwest::Method;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection reset, host unreachable) return `true`.
/// Permanent failures (HTTP status errors, bad URLs, local permission errors) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts, DNS/connect failures and broken bodies are transient
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            // The core never retries on a status; the server answered
            Error::Http { .. } => false,
            Error::RetriesExhausted { .. } => false,
            Error::TooManyRedirects { .. } | Error::RedirectUnresolved { .. } => false,
            Error::InvalidUrl(_) | Error::InvalidHeader(_) => false,
            Error::Config { .. } => false,
            Error::Other(_) => false,
        }
    }
}

/// Whether the failure proves the request never reached the server
fn never_sent(error: &Error) -> bool {
    match error {
        Error::Network(e) => e.is_connect(),
        Error::Io(e) => e.kind() == std::io::ErrorKind::ConnectionRefused,
        _ => false,
    }
}

/// Whether replaying `method` cannot change server state twice
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Decides whether a failed attempt is retried
///
/// `attempts` counts failed attempts so far for the logical request,
/// redirects included; it is 1 after the first failure.
pub trait RetryPolicy: Send + Sync {
    /// Whether another attempt should be made after `error`
    fn should_retry(&self, error: &Error, attempts: u32, request: &Request) -> bool;

    /// Delay before attempt number `attempts + 1` (default: none)
    fn backoff(&self, _attempts: u32) -> Duration {
        Duration::ZERO
    }
}

/// Bounded retries with exponential backoff
#[derive(Clone, Debug, Default)]
pub struct DefaultRetryPolicy {
    config: RetryConfig,
}

impl DefaultRetryPolicy {
    /// Create a policy from retry configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The configuration this policy applies
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn base_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(32) as i32;
        let secs = self.config.initial_delay.as_secs_f64()
            * self.config.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.config.max_delay.as_secs_f64()))
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(&self, error: &Error, attempts: u32, request: &Request) -> bool {
        if attempts > self.config.max_attempts || !error.is_retryable() {
            return false;
        }

        is_idempotent(&request.method) || never_sent(error)
    }

    fn backoff(&self, attempts: u32) -> Duration {
        let delay = self.base_delay(attempts);
        if self.config.jitter {
            add_jitter(delay)
        } else {
            delay
        }
    }
}

/// Retry policy that never retries
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _error: &Error, _attempts: u32, _request: &Request) -> bool {
        false
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
