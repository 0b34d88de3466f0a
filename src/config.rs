//! Configuration types for reqflow

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration shared by every executor created from one client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Charset used when a response's content-type names none (default: "UTF-8")
    #[serde(default = "default_charset")]
    pub default_charset: String,

    /// Maximum number of requests running at once (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// TCP connect timeout (default: 15 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Whole-request timeout, body transfer included (None = no limit)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// User-Agent header sent with every request (None = client default)
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Maximum redirects followed for one logical request (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// GET response cache behavior
    #[serde(default)]
    pub cache: CacheConfig,

    /// Progress event behavior
    #[serde(default)]
    pub progress: ProgressConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_charset: default_charset(),
            max_concurrent_requests: default_max_concurrent(),
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            user_agent: None,
            max_redirects: default_max_redirects(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl Config {
    /// Check settings that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(Error::Config {
                message: "max_concurrent_requests must be at least 1".to_string(),
                key: Some("max_concurrent_requests".to_string()),
            });
        }

        if encoding_rs::Encoding::for_label(self.default_charset.trim().as_bytes()).is_none() {
            return Err(Error::Config {
                message: format!("unknown charset '{}'", self.default_charset),
                key: Some("default_charset".to_string()),
            });
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be >= 1.0".to_string(),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }

        Ok(())
    }
}

/// Retry configuration for transient transport failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 milliseconds)
    #[serde(default = "default_initial_delay", with = "millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// GET response cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether GET string responses are cached at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Expiry applied when an executor does not override it (default: 60 seconds)
    #[serde(default = "default_cache_expiry", with = "millis_serde")]
    pub default_expiry: Duration,

    /// Capacity of the process-wide cache, fixed by the first client built (default: 256)
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_expiry: default_cache_expiry(),
            max_entries: default_cache_entries(),
        }
    }
}

/// Progress event configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Minimum interval between loading events unless the callback sets one (default: 1000 ms)
    #[serde(default = "default_progress_rate", with = "millis_serde")]
    pub default_rate: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            default_rate: default_progress_rate(),
        }
    }
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_max_concurrent() -> usize {
    3
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_max_redirects() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_cache_expiry() -> Duration {
    crate::cache::DEFAULT_EXPIRY
}

fn default_cache_entries() -> usize {
    256
}

fn default_progress_rate() -> Duration {
    Duration::from_millis(1000)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// Duration serialization helper (milliseconds)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert_eq!(config.default_charset, "UTF-8");
        assert_eq!(config.max_concurrent_requests, 3);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cache.default_expiry, Duration::from_secs(60));
        assert!(config.cache.enabled);
        assert_eq!(config.progress.default_rate, Duration::from_millis(1000));
    }

    #[test]
    fn durations_use_their_declared_units() {
        let json = r#"{
            "request_timeout": 5,
            "retry": { "initial_delay": 250, "max_delay": 2000 },
            "cache": { "default_expiry": 1500 }
        }"#;
        let config: Config = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(2));
        assert_eq!(config.cache.default_expiry, Duration::from_millis(1500));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config {
            user_agent: Some("reqflow-test".to_string()),
            max_redirects: 4,
            ..Config::default()
        };

        let json = serde_json::to_string(&config).expect("serialize failed");
        let back: Config = serde_json::from_str(&json).expect("deserialize failed");

        assert_eq!(back.user_agent.as_deref(), Some("reqflow-test"));
        assert_eq!(back.max_redirects, 4);
        assert_eq!(back.retry.initial_delay, config.retry.initial_delay);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = Config {
            max_concurrent_requests: 0,
            ..Config::default()
        };

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("max_concurrent_requests"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unknown_charset() {
        let config = Config {
            default_charset: "not-a-charset".to_string(),
            ..Config::default()
        };

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("default_charset")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
