//! Core types for reqflow

use crate::error::{Error, ErrorDetail, Result};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Description of one HTTP request
///
/// Identity is the URL plus the method. The executor only touches the
/// `Range` header (when resuming) and otherwise sends the request as built.
#[derive(Clone, Debug)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Target URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request for the given method and URL
    pub fn new(method: Method, url: &str) -> Result<Self> {
        Ok(Self {
            method,
            url: Url::parse(url)?,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    /// Create a GET request
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// Create a POST request
    pub fn post(url: &str) -> Result<Self> {
        Self::new(Method::POST, url)
    }

    /// Add a header, replacing any previous value with the same name
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Attach a request body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether this is a GET request
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Ask the server to continue from byte `offset` (`Range: bytes=offset-`)
    pub fn set_range_from(&mut self, offset: u64) {
        // A formatted integer range is always a valid header value
        if let Ok(value) = HeaderValue::from_str(&format!("bytes={offset}-")) {
            self.headers.insert(RANGE, value);
        }
    }

    /// Start offset of the `Range` header, if one of the form `bytes=N-` is set
    pub fn range_start(&self) -> Option<u64> {
        let value = self.headers.get(RANGE)?.to_str().ok()?;
        let spec = value.strip_prefix("bytes=")?;
        let (start, _) = spec.split_once('-')?;
        start.trim().parse().ok()
    }

    /// Build the reqwest request for this description
    pub(crate) fn to_builder(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        builder
    }
}

/// Where a file-mode request writes its body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Destination file
    pub path: PathBuf,
    /// Continue from the existing file length instead of starting over
    pub resume: bool,
    /// Rename the finished file after the server's Content-Disposition filename
    pub auto_rename: bool,
}

impl DownloadTarget {
    /// Download to `path`, starting over if the file exists
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resume: false,
            auto_rename: false,
        }
    }

    /// Download to `path`, continuing a partial file if present
    pub fn resume(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resume: true,
            auto_rename: false,
        }
    }

    /// Enable or disable renaming from Content-Disposition
    pub fn with_auto_rename(mut self, auto_rename: bool) -> Self {
        self.auto_rename = auto_rename;
        self
    }
}

/// Byte accounting for a file download, owned by one executor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadState {
    /// Destination file
    pub path: PathBuf,
    /// Whether the download continues a partial file
    pub resume: bool,
    /// Expected total size in bytes (0 when unknown)
    pub total: u64,
    /// Bytes present in the file so far
    pub current: u64,
}

impl DownloadState {
    pub(crate) fn new(target: &DownloadTarget) -> Self {
        Self {
            path: target.path.clone(),
            resume: target.resume,
            total: 0,
            current: 0,
        }
    }
}

/// Body delivered to a successful callback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Decoded string body (string mode)
    Text(String),
    /// Path of the written file (file mode)
    File(PathBuf),
}

impl ResponseBody {
    /// The decoded text, if this is a string-mode body
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::File(_) => None,
        }
    }

    /// The file path, if this is a file-mode body
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ResponseBody::Text(_) => None,
            ResponseBody::File(path) => Some(path),
        }
    }
}

/// Result handed to `on_success`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    /// Response body
    pub body: ResponseBody,
    /// Status of the final response (None when served from cache)
    pub status: Option<u16>,
    /// URL the body was obtained from (after redirects)
    pub url: String,
    /// Whether the body came from the GET cache
    pub from_cache: bool,
    /// Whether a file download appended to an existing partial file
    pub resumed: bool,
    /// Content-Length of the final response, if the server sent one
    pub content_length: Option<u64>,
}

/// Lifecycle event posted from the worker to the delivery channel
#[derive(Debug)]
pub enum TaskEvent {
    /// Execution started; emitted once before any network attempt
    Started,
    /// Progress update
    Loading {
        /// Total bytes expected (0 when unknown)
        total: u64,
        /// Bytes handled so far
        current: u64,
    },
    /// Terminal success
    Success(ResponseInfo),
    /// Terminal failure
    Failure(Error),
    /// Execution ended because `stop()` was requested
    Cancelled,
}

/// Final observable state of one execution, returned by `TaskHandle::wait`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// `on_success` fired with this result
    Success(ResponseInfo),
    /// `on_failure` fired for this error
    Failure(ErrorDetail),
    /// Stopped before a terminal callback fired
    Cancelled,
}

impl TaskOutcome {
    /// Whether the execution ended in success
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }
}
