//! Client construction and policy fixtures for integration tests

use reqflow::config::RetryConfig;
use reqflow::{Config, Error, HttpClient, Request, RetryPolicy};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Config with fast, deterministic retries
pub fn test_config() -> Config {
    Config {
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}

/// Client built from [`test_config`]
pub fn test_client() -> HttpClient {
    HttpClient::new(test_config()).unwrap()
}

/// URL on a local port with nothing listening
pub fn closed_port_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}{path}")
}

/// Retry policy that allows `max` retries and records every attempt count it is asked about
#[derive(Clone, Default)]
pub struct RecordingPolicy {
    max: u32,
    seen: Arc<Mutex<Vec<u32>>>,
}

impl RecordingPolicy {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<u32> {
        self.seen.lock().unwrap().clone()
    }
}

impl RetryPolicy for RecordingPolicy {
    fn should_retry(&self, _error: &Error, attempts: u32, _request: &Request) -> bool {
        self.seen.lock().unwrap().push(attempts);
        attempts <= self.max
    }
}

/// Client whose retries are decided by `policy`
pub fn client_with_policy(config: Config, policy: RecordingPolicy) -> HttpClient {
    HttpClient::builder(config)
        .retry_policy(Arc::new(policy))
        .build()
        .unwrap()
}
