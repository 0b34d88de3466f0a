use super::RequestExecutor;
use crate::callback::ProgressReporter;
use crate::charset;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::redirect::ResponseHead;
use crate::types::{DownloadState, DownloadTarget, Request, ResponseBody, ResponseInfo};
use crate::utils;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, RANGE};

/// What a single network attempt produced
#[derive(Debug)]
enum Handled {
    Done(ResponseInfo),
    Redirect(Request),
    Stopped,
}

impl RequestExecutor {
    /// Drive one logical request to a terminal result
    ///
    /// Returns `Ok(None)` when the execution was stopped. Retries and
    /// redirects run sequentially on this task and share one attempt counter.
    pub(super) async fn send_request(
        &self,
        mut request: Request,
        target: Option<DownloadTarget>,
        progress: &mut ProgressReporter,
    ) -> Result<Option<ResponseInfo>> {
        let mut download = target.as_ref().map(DownloadState::new);
        let auto_rename = target.as_ref().is_some_and(|t| t.auto_rename);
        let max_redirects = self.client.config.max_redirects;
        let mut attempts: u32 = 0;
        let mut redirects: u32 = 0;

        loop {
            let offset = match &download {
                Some(state) => prepare_resume(&mut request, state).await?,
                None => 0,
            };

            if download.is_none()
                && let Some(info) = self.cached(&request)
            {
                return Ok(Some(info));
            }

            if progress.is_stopped() {
                return Ok(None);
            }

            tracing::debug!(
                url = %request.url,
                method = %request.method,
                attempt = attempts + 1,
                "sending request"
            );

            let result = match request.to_builder(&self.client.http).send().await {
                Ok(response) => {
                    self.handle_response(
                        &request,
                        response,
                        download.as_mut(),
                        offset,
                        auto_rename,
                        progress,
                    )
                    .await
                }
                Err(e) => Err(Error::Network(e)),
            };

            match result {
                Ok(Handled::Done(info)) => return Ok(Some(info)),
                Ok(Handled::Stopped) => return Ok(None),
                Ok(Handled::Redirect(next)) => {
                    redirects += 1;
                    if redirects > max_redirects {
                        return Err(Error::TooManyRedirects { max: max_redirects });
                    }
                    tracing::debug!(
                        from = %request.url,
                        to = %next.url,
                        redirects,
                        "following redirect"
                    );
                    request = next;
                }
                Err(e @ (Error::Network(_) | Error::Io(_))) => {
                    attempts += 1;

                    if !self.client.retry.should_retry(&e, attempts, &request) {
                        tracing::error!(
                            url = %request.url,
                            attempt = attempts,
                            error = %e,
                            "giving up on request"
                        );
                        return Err(Error::RetriesExhausted {
                            attempts,
                            source: Box::new(e),
                        });
                    }

                    let delay = self.client.retry.backoff(attempts);
                    tracing::warn!(
                        url = %request.url,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );

                    tokio::select! {
                        _ = self.stop.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Unexpired cached body for a GET in string mode
    fn cached(&self, request: &Request) -> Option<ResponseInfo> {
        if !self.client.config.cache.enabled || !request.is_get() {
            return None;
        }

        let key = utils::cache_key(&request.url);
        let body = self.client.cache.get(&key)?;
        tracing::debug!(url = %key, bytes = body.len(), "cache hit");

        Some(ResponseInfo {
            content_length: Some(body.len() as u64),
            body: ResponseBody::Text(body),
            status: None,
            url: key,
            from_cache: true,
            resumed: false,
        })
    }

    async fn handle_response(
        &self,
        request: &Request,
        response: reqwest::Response,
        download: Option<&mut DownloadState>,
        offset: u64,
        auto_rename: bool,
        progress: &mut ProgressReporter,
    ) -> Result<Handled> {
        let status = response.status();

        if status.is_redirection() {
            return self.redirect(request, &response);
        }

        if status.as_u16() >= 300 {
            return Err(Error::from_response(&response));
        }

        let url = response.url().to_string();
        let content_length = response.content_length();

        match download {
            Some(state) => {
                let Some(file) =
                    dispatch::write_file(response, state, offset, auto_rename, progress).await?
                else {
                    return Ok(Handled::Stopped);
                };

                Ok(Handled::Done(ResponseInfo {
                    body: ResponseBody::File(file.path),
                    status: Some(status.as_u16()),
                    url,
                    from_cache: false,
                    resumed: file.resumed,
                    content_length,
                }))
            }
            None => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok());
                let encoding =
                    charset::resolve_charset(content_type, &self.client.config.default_charset);

                let Some(text) = dispatch::read_string(response, encoding, progress).await? else {
                    return Ok(Handled::Stopped);
                };

                if self.client.config.cache.enabled && request.is_get() {
                    let key = utils::cache_key(&request.url);
                    self.client.cache.put(&key, text.clone(), self.expiry);
                }

                Ok(Handled::Done(ResponseInfo {
                    body: ResponseBody::Text(text),
                    status: Some(status.as_u16()),
                    url,
                    from_cache: false,
                    resumed: false,
                    content_length,
                }))
            }
        }
    }

    fn redirect(&self, request: &Request, response: &reqwest::Response) -> Result<Handled> {
        let status = response.status();
        let followable = matches!(
            status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        );

        // 300 Multiple Choices and 304 Not Modified are not redirects to follow
        if !followable {
            return Err(Error::from_response(response));
        }

        let head = ResponseHead::from_response(response);
        match self.redirect_resolver.resolve(request, &head) {
            Some(next) => Ok(Handled::Redirect(next)),
            None => Err(Error::RedirectUnresolved {
                status: status.as_u16(),
            }),
        }
    }
}

/// Set or clear the `Range` header from the partial file on disk
///
/// Runs before every attempt so a retry continues from what the previous
/// attempt managed to write. Returns the resume offset (0 when starting over).
pub(super) async fn prepare_resume(request: &mut Request, state: &DownloadState) -> Result<u64> {
    if !state.resume {
        return Ok(0);
    }

    let existing = match tokio::fs::metadata(&state.path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };

    if existing > 0 {
        tracing::debug!(path = %state.path.display(), offset = existing, "resuming download");
        request.set_range_from(existing);
    } else {
        request.headers.remove(RANGE);
    }

    Ok(existing)
}
