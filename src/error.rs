//! Error types for reqflow
//!
//! This module provides the error handling surface of the executor:
//! - Transport failures (host resolution, connection, I/O) that may be retried
//! - Terminal HTTP failures carrying a status code and reason phrase
//! - Redirect and configuration failures
//! - A serializable [`ErrorDetail`] for reporting failures to callers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for reqflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reqflow
///
/// Every terminal failure of a request is reported to the caller's callback as
/// one of these variants, together with its `Display` message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "default_charset")
        key: Option<String>,
    },

    /// Transport-level failure reported by the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (local file access or a broken response stream)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with a status the executor does not accept
    #[error("HTTP {status}: {reason}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Reason phrase for the status (canonical phrase when the server sent none)
        reason: String,
    },

    /// Retry policy refused another attempt; wraps the last transient error
    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Failed attempts for the logical request, the first one included
        attempts: u32,
        /// The last error observed
        #[source]
        source: Box<Error>,
    },

    /// Redirect chain exceeded the configured maximum
    #[error("too many redirects (max {max})")]
    TooManyRedirects {
        /// Configured redirect limit
        max: u32,
    },

    /// A redirect response could not be turned into a follow-up request
    #[error("redirect response {status} could not be resolved to a new request")]
    RedirectUnresolved {
        /// The 3xx status that was received
        status: u16,
    },

    /// Request URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Header name or value rejected while building a request
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a terminal HTTP failure from a status code, with its canonical reason phrase
    pub fn http(status: reqwest::StatusCode) -> Self {
        Self::http_with_reason(status, None)
    }

    /// Build a terminal HTTP failure, preferring the reason phrase the server sent
    ///
    /// Falls back to the canonical phrase when `reason` is absent or empty.
    pub fn http_with_reason(status: reqwest::StatusCode, reason: Option<&str>) -> Self {
        let reason = reason
            .map(str::trim)
            .filter(|phrase| !phrase.is_empty())
            .or_else(|| status.canonical_reason())
            .unwrap_or("Unknown");

        Error::Http {
            status: status.as_u16(),
            reason: reason.to_string(),
        }
    }

    /// Terminal HTTP failure for a received response
    ///
    /// hyper only records the reason phrase when it differs from the canonical one.
    pub(crate) fn from_response(response: &reqwest::Response) -> Self {
        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok());

        Self::http_with_reason(response.status(), reason)
    }

    /// HTTP status code carried by this error, if any
    ///
    /// Looks through [`Error::RetriesExhausted`] to the wrapped error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::RedirectUnresolved { status } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            Error::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// HTTP reason phrase carried by this error, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Error::Http { reason, .. } => Some(reason),
            Error::RetriesExhausted { source, .. } => source.reason(),
            _ => None,
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Http { .. } => "http_error",
            Error::RetriesExhausted { .. } => "retries_exhausted",
            Error::TooManyRedirects { .. } => "too_many_redirects",
            Error::RedirectUnresolved { .. } => "redirect_unresolved",
            Error::InvalidUrl(_) => "invalid_url",
            Error::InvalidHeader(_) => "invalid_header",
            Error::Other(_) => "other",
        }
    }
}

/// Serializable description of a terminal failure
///
/// # Example JSON
///
/// ```json
/// {
///   "code": "http_error",
///   "message": "HTTP 404: Not Found",
///   "status": 404,
///   "reason": "Not Found"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "http_error", "retries_exhausted")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code, when the failure came from a server response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// HTTP reason phrase, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&Error> for ErrorDetail {
    fn from(error: &Error) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            status: error.status(),
            reason: error.reason().map(str::to_string),
        }
    }
}
