//! Per-request executor
//!
//! A [`RequestExecutor`] runs exactly one logical request: cache lookup,
//! network attempts with retries, redirect following, body dispatch and
//! callback emission. It is consumed by [`RequestExecutor::execute`], which
//! returns a [`TaskHandle`] for cancellation and for awaiting the outcome.
//!
//! Work runs on a Tokio task that first takes a permit from the client's
//! bounded worker pool. Callbacks run on a second task that drains the
//! ordered event channel (see [`crate::callback`]).

mod send;


use crate::callback::{self, EventSink, ProgressReporter, ProgressSettings, RequestCallback};
use crate::client::ClientInner;
use crate::error::{Error, ErrorDetail};
use crate::redirect::{DefaultRedirectResolver, RedirectResolver};
use crate::types::{DownloadTarget, Request, TaskEvent, TaskOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Orchestrates one request's full lifecycle
pub struct RequestExecutor {
    client: Arc<ClientInner>,
    expiry: Duration,
    redirect_resolver: Arc<dyn RedirectResolver>,
    stop: CancellationToken,
}

impl RequestExecutor {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        let expiry = client.config.cache.default_expiry;
        Self {
            client,
            expiry,
            redirect_resolver: Arc::new(DefaultRedirectResolver),
            stop: CancellationToken::new(),
        }
    }

    /// Cache lifetime for the string body this executor may store
    pub fn set_expiry(&mut self, expiry: Duration) -> &mut Self {
        self.expiry = expiry;
        self
    }

    /// Replace the redirect resolver
    pub fn set_redirect_resolver(&mut self, resolver: Arc<dyn RedirectResolver>) -> &mut Self {
        self.redirect_resolver = resolver;
        self
    }

    /// Request cancellation
    ///
    /// Calling this before [`execute`](Self::execute) makes the execution end
    /// without any network call and without `on_start`.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_stop(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Run `request` in the background and report to `callback`
    ///
    /// With a `target` the body is written to that file (file mode);
    /// without one it is decoded into a string (string mode).
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn execute<C: RequestCallback>(
        self,
        request: Request,
        target: Option<DownloadTarget>,
        callback: C,
    ) -> TaskHandle {
        let settings =
            ProgressSettings::from_callback(&callback, self.client.config.progress.default_rate);
        let (sink, events) = EventSink::channel();
        let stop = self.stop.clone();

        let delivery = tokio::spawn(callback::deliver(events, callback, stop.clone()));
        let worker = tokio::spawn(self.run(request, target, sink, settings));

        TaskHandle {
            stop,
            worker,
            delivery,
        }
    }

    async fn run(
        self,
        request: Request,
        target: Option<DownloadTarget>,
        sink: EventSink,
        settings: ProgressSettings,
    ) {
        let permit = tokio::select! {
            biased;
            _ = self.stop.cancelled() => {
                sink.send(TaskEvent::Cancelled);
                return;
            }
            permit = self.client.workers.clone().acquire_owned() => permit,
        };

        let Ok(_permit) = permit else {
            sink.send(TaskEvent::Failure(Error::Other(
                "worker pool closed".to_string(),
            )));
            return;
        };

        if self.stop.is_cancelled() {
            sink.send(TaskEvent::Cancelled);
            return;
        }

        sink.send(TaskEvent::Started);

        let url = request.url.to_string();
        let method = request.method.clone();
        let mut progress = ProgressReporter::new(sink.clone(), settings, self.stop.clone());

        match self.send_request(request, target, &mut progress).await {
            Ok(Some(info)) => {
                tracing::debug!(%url, %method, from_cache = info.from_cache, "request succeeded");
                sink.send(TaskEvent::Success(info));
            }
            Ok(None) => {
                tracing::info!(%url, %method, "request cancelled");
                sink.send(TaskEvent::Cancelled);
            }
            Err(e) => {
                tracing::error!(%url, %method, error = %e, "request failed");
                sink.send(TaskEvent::Failure(e));
            }
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("expiry", &self.expiry)
            .field("stopped", &self.is_stop())
            .finish()
    }
}

/// Handle to a running execution
#[derive(Debug)]
pub struct TaskHandle {
    stop: CancellationToken,
    worker: JoinHandle<()>,
    delivery: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    /// Request cancellation
    ///
    /// The worker stops at its next checkpoint (before a network attempt or
    /// between body chunks); no further callbacks fire except `on_cancelled`.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_stop(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Wait until the worker has finished and every callback has run
    pub async fn wait(self) -> TaskOutcome {
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "request worker panicked");
        }

        match self.delivery.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "callback task panicked");
                TaskOutcome::Failure(ErrorDetail::from(&Error::Other(format!(
                    "callback task panicked: {e}"
                ))))
            }
        }
    }
}
