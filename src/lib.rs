//! # reqflow
//!
//! Asynchronous single-request HTTP executor.
//!
//! ## Design Philosophy
//!
//! reqflow is designed to be:
//! - **One request, one lifecycle** - Each [`RequestExecutor`] runs exactly one logical request
//! - **Ordered callbacks** - `on_start` once, `on_loading` zero or more times, then exactly one of
//!   `on_success` / `on_failure`
//! - **Pluggable policies** - Cache, retry and redirect behavior are traits with sensible defaults
//! - **Cooperative cancellation** - `stop()` is observed before every network attempt and between
//!   body chunks
//!
//! ## Quick Start
//!
//! ```no_run
//! use reqflow::{
//!     Config, DownloadTarget, Error, HttpClient, Request, RequestCallback, ResponseInfo,
//! };
//!
//! struct Report;
//!
//! impl RequestCallback for Report {
//!     fn on_loading(&mut self, total: u64, current: u64) {
//!         println!("{current}/{total} bytes");
//!     }
//!
//!     fn on_success(&mut self, result: ResponseInfo) {
//!         println!("saved to {:?}", result.body.as_path());
//!     }
//!
//!     fn on_failure(&mut self, _error: Error, message: String) {
//!         eprintln!("download failed: {message}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(Config::default())?;
//!
//!     let handle = client.send(
//!         Request::get("https://example.com/big.iso")?,
//!         Some(DownloadTarget::resume("downloads/big.iso")),
//!         Report,
//!     );
//!
//!     handle.wait().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// GET response cache
pub mod cache;
/// Caller callbacks and ordered delivery
pub mod callback;
/// Content-type charset resolution
pub mod charset;
/// Shared client: transport, worker pool, policies
pub mod client;
/// Configuration types
pub mod config;
mod dispatch;
/// Error types
pub mod error;
/// Per-request executor
pub mod executor;
/// Redirect resolution
pub mod redirect;
/// Retry logic with exponential backoff
pub mod retry;
/// Progress event throttling
pub mod throttle;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use cache::{GetCache, MemoryCache};
pub use callback::RequestCallback;
pub use client::{HttpClient, HttpClientBuilder};
pub use config::Config;
pub use error::{Error, ErrorDetail, Result};
pub use executor::{RequestExecutor, TaskHandle};
pub use redirect::{
    DefaultRedirectResolver, LimitedRedirectResolver, RedirectResolver, ResponseHead,
};
pub use retry::{DefaultRetryPolicy, IsRetryable, NoRetry, RetryPolicy};
pub use throttle::ProgressThrottle;
pub use types::{
    DownloadState, DownloadTarget, Request, ResponseBody, ResponseInfo, TaskEvent, TaskOutcome,
};
