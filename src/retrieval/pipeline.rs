use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use url::Url;

use super::backoff::calculate_backoff_delay;
use super::resolver::UrlResolver;
use super::types::{ErrorKind, RetrievalOutcome, RetrievalRequest, RetrievalSummary};
use super::validator::ContentValidator;
use crate::config::Config;
use crate::fetcher::Transport;
use crate::repositories::DocumentStore;

/// Attempts, per-attempt timeout and backoff bounds for one request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            request_timeout: config.request_timeout(),
            base_backoff: config.base_backoff(),
            max_backoff: config.max_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(30),
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Where a single request stands.
#[derive(Debug)]
enum State {
    Pending,
    Resolved(Url),
    Fetched(Bytes),
    Validated(Bytes),
    Saved(u64),
    SkippedExisting,
    Failed(ErrorKind),
}

/// Resolve, fetch, validate and store documents.
///
/// Every request ends in exactly one outcome; a failed request never aborts
/// the batch. A document whose canonical name already exists in the store is
/// skipped before any network traffic.
#[derive(Clone)]
pub struct RetrievalPipeline {
    transport: Arc<dyn Transport>,
    store: Arc<dyn DocumentStore>,
    validator: Arc<dyn ContentValidator>,
    resolver: UrlResolver,
    policy: RetryPolicy,
    concurrency: usize,
}

impl RetrievalPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn DocumentStore>,
        validator: Arc<dyn ContentValidator>,
        resolver: UrlResolver,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            store,
            validator,
            resolver,
            policy,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Process every request and collect the outcomes in request order.
    pub async fn run(&self, requests: Vec<RetrievalRequest>) -> RetrievalSummary {
        info!(
            "Retrieving {} documents with concurrency {}",
            requests.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let pipeline = self.clone();
            let semaphore = semaphore.clone();
            let span = info_span!("document", name = %request.canonical_name);
            let fallback = request.clone();

            let handle = tokio::spawn(
                async move {
                    // Hold permit until the request completes
                    let _permit = semaphore.acquire_owned().await.ok();
                    pipeline.retrieve(&request).await
                }
                .instrument(span),
            );
            handles.push((fallback, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (request, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // Nothing was stored, so the next run tries again
                    error!("Retrieval task for {} failed: {}", request.source_url, e);
                    outcomes.push(RetrievalOutcome::failed(&request, ErrorKind::TaskFailed, 0));
                }
            }
        }

        let summary = RetrievalSummary::from_outcomes(outcomes);
        debug!("Batch done: {}", summary);
        summary
    }

    /// Drive one request through the state machine.
    #[instrument(skip_all, fields(source = %request.source_url))]
    pub async fn retrieve(&self, request: &RetrievalRequest) -> RetrievalOutcome {
        let mut attempts = 0;
        let mut state = State::Pending;

        loop {
            state = match state {
                State::Pending => self.check_and_resolve(request).await,
                State::Resolved(url) => match self.fetch_with_retry(&url, &mut attempts).await {
                    Ok(bytes) => State::Fetched(bytes),
                    Err(kind) => State::Failed(kind),
                },
                State::Fetched(bytes) => {
                    if self.validator.validate(&bytes) {
                        State::Validated(bytes)
                    } else {
                        warn!(
                            "{} is not a valid {} document",
                            request.source_url,
                            self.validator.format().extension()
                        );
                        State::Failed(ErrorKind::InvalidContent)
                    }
                }
                State::Validated(bytes) => {
                    match self.store.save(&request.canonical_name, &bytes).await {
                        Ok(written) => State::Saved(written),
                        Err(e) => {
                            error!("Failed to store {}: {}", request.canonical_name, e);
                            State::Failed(ErrorKind::Storage)
                        }
                    }
                }
                State::Saved(written) => {
                    info!("Saved {} ({} bytes)", request.canonical_name, written);
                    return RetrievalOutcome::saved(request, written, attempts);
                }
                State::SkippedExisting => {
                    debug!("{} already exists, skipping", request.canonical_name);
                    return RetrievalOutcome::skipped(request);
                }
                State::Failed(kind) => {
                    warn!("Retrieval of {} failed: {}", request.source_url, kind);
                    return RetrievalOutcome::failed(request, kind, attempts);
                }
            };
        }
    }

    async fn check_and_resolve(&self, request: &RetrievalRequest) -> State {
        match self.store.exists(&request.canonical_name).await {
            Ok(true) => return State::SkippedExisting,
            Ok(false) => {}
            Err(e) => {
                error!("Existence check for {} failed: {}", request.canonical_name, e);
                return State::Failed(ErrorKind::Storage);
            }
        }

        match self.resolver.resolve(&request.source_url) {
            Ok(url) => State::Resolved(url),
            Err(e) => {
                warn!("Cannot resolve {}: {}", request.source_url, e);
                State::Failed(ErrorKind::UnresolvableSource)
            }
        }
    }

    /// Transient failures are retried with backoff until attempts run out;
    /// anything else fails on the spot.
    async fn fetch_with_retry(&self, url: &Url, attempts: &mut u32) -> Result<Bytes, ErrorKind> {
        let max_attempts = self.policy.max_attempts.max(1);

        loop {
            *attempts += 1;
            let err = match self
                .transport
                .fetch(url.as_str(), self.policy.request_timeout)
                .await
            {
                Ok(fetched) => return Ok(fetched.body),
                Err(e) => e,
            };

            if !err.should_retry() {
                warn!("Fetching {} failed permanently: {}", url, err);
                return Err(err.kind());
            }

            if *attempts >= max_attempts {
                warn!(
                    "Fetching {} failed after {} attempts: {}",
                    url, attempts, err
                );
                return Err(ErrorKind::TransientNetwork);
            }

            let delay = calculate_backoff_delay(
                *attempts - 1,
                self.policy.base_backoff,
                self.policy.max_backoff,
            );
            info!(
                "Fetching {} failed ({}), retrying in {}ms (attempt {}/{})",
                url,
                err,
                delay.as_millis(),
                *attempts + 1,
                max_attempts
            );
            sleep(delay).await;
        }
    }
}
