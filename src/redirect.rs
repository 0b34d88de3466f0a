//! Redirect resolution
//!
//! The HTTP client is built with redirect following disabled; the executor
//! asks a [`RedirectResolver`] for the next request whenever a redirect
//! status comes back.

use crate::types::Request;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HeaderMap, LOCATION};
use reqwest::{Method, StatusCode};
use std::sync::atomic::{AtomicU32, Ordering};
use url::Url;

/// Status line and headers of a response, detached from its body
#[derive(Clone, Debug)]
pub struct ResponseHead {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// URL that produced this response
    pub url: Url,
}

impl ResponseHead {
    pub(crate) fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        }
    }
}

/// Produces the follow-up request for a redirect response
pub trait RedirectResolver: Send + Sync {
    /// Next request to issue, or `None` to stop following
    fn resolve(&self, request: &Request, response: &ResponseHead) -> Option<Request>;
}

impl<F> RedirectResolver for F
where
    F: Fn(&Request, &ResponseHead) -> Option<Request> + Send + Sync,
{
    fn resolve(&self, request: &Request, response: &ResponseHead) -> Option<Request> {
        self(request, response)
    }
}

/// Follows the `Location` header
///
/// Relative locations resolve against the current request URL. A 303 turns
/// the request into a body-less GET; every other status keeps the method.
/// Credentials are dropped when the redirect leaves the original host.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRedirectResolver;

impl RedirectResolver for DefaultRedirectResolver {
    fn resolve(&self, request: &Request, response: &ResponseHead) -> Option<Request> {
        let location = response.headers.get(LOCATION)?.to_str().ok()?;
        let url = request.url.join(location.trim()).ok()?;

        let mut next = request.clone();

        if response.status == StatusCode::SEE_OTHER && next.method != Method::HEAD {
            next.method = Method::GET;
            next.body = None;
            next.headers.remove(CONTENT_TYPE);
            next.headers.remove(CONTENT_LENGTH);
        }

        if url.host_str() != request.url.host_str()
            || url.port_or_known_default() != request.url.port_or_known_default()
        {
            next.headers.remove(AUTHORIZATION);
            next.headers.remove(COOKIE);
        }

        next.url = url;
        Some(next)
    }
}

/// Wraps another resolver and stops after a fixed number of redirects
#[derive(Debug)]
pub struct LimitedRedirectResolver<R> {
    inner: R,
    max: u32,
    followed: AtomicU32,
}

impl<R: RedirectResolver> LimitedRedirectResolver<R> {
    /// Follow at most `max` redirects through `inner`
    pub fn new(inner: R, max: u32) -> Self {
        Self {
            inner,
            max,
            followed: AtomicU32::new(0),
        }
    }
}

impl<R: RedirectResolver> RedirectResolver for LimitedRedirectResolver<R> {
    fn resolve(&self, request: &Request, response: &ResponseHead) -> Option<Request> {
        if self.followed.fetch_add(1, Ordering::SeqCst) >= self.max {
            tracing::debug!(max = self.max, url = %response.url, "redirect limit reached");
            return None;
        }
        self.inner.resolve(request, response)
    }
}
