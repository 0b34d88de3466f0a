//! Shared client state: transport, worker pool, cache and retry policy
//!
//! An [`HttpClient`] is cheap to clone and is meant to live for the whole
//! process. Every logical request gets its own [`RequestExecutor`] from
//! [`HttpClient::executor`].

use crate::cache::{GetCache, MemoryCache};
use crate::callback::RequestCallback;
use crate::config::Config;
use crate::error::Result;
use crate::executor::{RequestExecutor, TaskHandle};
use crate::retry::{DefaultRetryPolicy, RetryPolicy};
use crate::types::{DownloadTarget, Request};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// State shared by every executor created from one client
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) config: Config,
    pub(crate) cache: Arc<dyn GetCache>,
    pub(crate) retry: Arc<dyn RetryPolicy>,
    pub(crate) workers: Arc<Semaphore>,
}

/// Entry point for issuing requests
///
/// # Example
///
/// ```no_run
/// use reqflow::{Config, Error, HttpClient, Request, RequestCallback, ResponseInfo};
///
/// struct Print;
///
/// impl RequestCallback for Print {
///     fn on_success(&mut self, result: ResponseInfo) {
///         println!("{:?}", result.body.as_text());
///     }
///
///     fn on_failure(&mut self, _error: Error, message: String) {
///         eprintln!("failed: {message}");
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(Config::default())?;
/// let handle = client.send(Request::get("https://example.com/")?, None, Print);
/// handle.wait().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    /// Create a client with the process-wide cache and the default retry policy
    pub fn new(config: Config) -> Result<Self> {
        HttpClientBuilder::new(config).build()
    }

    /// Start building a client with custom collaborators
    pub fn builder(config: Config) -> HttpClientBuilder {
        HttpClientBuilder::new(config)
    }

    /// Create an executor for one logical request
    pub fn executor(&self) -> RequestExecutor {
        RequestExecutor::new(self.inner.clone())
    }

    /// Shorthand for `self.executor().execute(request, target, callback)`
    pub fn send<C: RequestCallback>(
        &self,
        request: Request,
        target: Option<DownloadTarget>,
        callback: C,
    ) -> TaskHandle {
        self.executor().execute(request, target, callback)
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// GET cache used by this client's executors
    pub fn cache(&self) -> &Arc<dyn GetCache> {
        &self.inner.cache
    }

    /// Number of workers currently free
    pub fn available_workers(&self) -> usize {
        self.inner.workers.available_permits()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .field("available_workers", &self.available_workers())
            .finish()
    }
}

/// Builder for [`HttpClient`]
pub struct HttpClientBuilder {
    config: Config,
    cache: Option<Arc<dyn GetCache>>,
    retry: Option<Arc<dyn RetryPolicy>>,
    http: Option<reqwest::Client>,
}

impl HttpClientBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            cache: None,
            retry: None,
            http: None,
        }
    }

    /// Use `cache` instead of the process-wide [`MemoryCache::global`]
    pub fn cache(mut self, cache: Arc<dyn GetCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use `policy` instead of [`DefaultRetryPolicy`]
    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Use a preconfigured transport
    ///
    /// The client must not follow redirects itself, or redirect handling
    /// (and the shared attempt counter) is bypassed.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Validate the configuration and build the client
    pub fn build(self) -> Result<HttpClient> {
        self.config.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => build_transport(&self.config)?,
        };

        let cache: Arc<dyn GetCache> = match self.cache {
            Some(cache) => cache,
            None => MemoryCache::global(self.config.cache.max_entries),
        };

        let retry: Arc<dyn RetryPolicy> = match self.retry {
            Some(retry) => retry,
            None => Arc::new(DefaultRetryPolicy::new(self.config.retry.clone())),
        };

        let workers = Arc::new(Semaphore::new(self.config.max_concurrent_requests));

        Ok(HttpClient {
            inner: Arc::new(ClientInner {
                http,
                config: self.config,
                cache,
                retry,
                workers,
            }),
        })
    }
}

fn build_transport(config: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(config.connect_timeout);

    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    Ok(builder.build()?)
}
