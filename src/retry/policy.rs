//! Generic retry wrapper and the two retry classifiers.
//!
//! [`ConservativeRetryPolicy`] treats 5xx as final and is what
//! [`fetch_with_retry`](super::fetch_with_retry) uses.
//! [`AggressiveRetryPolicy`] also retries 5xx and network-sounding error
//! messages. Call sites pick the one matching how much they trust a
//! server error to be transient; the two are intentionally kept apart.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::backoff::BackoffConfig;
use super::fetch::{FetchRequest, FetchResponse, RetryCallback, Transport};
use crate::error::{GatewayError, Result};
use crate::metrics::HTTP_RETRIES;

/// Decides whether a failed attempt is worth repeating.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, err: &GatewayError) -> bool;
}

/// Retry only when no response arrived, or on 408 / 429.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConservativeRetryPolicy;

impl RetryPolicy for ConservativeRetryPolicy {
    fn should_retry(&self, err: &GatewayError) -> bool {
        match err {
            GatewayError::Transport(_) => true,
            GatewayError::Status { status, .. } => matches!(status, 408 | 429),
            _ => false,
        }
    }
}

const TRANSIENT_KEYWORDS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "econnreset",
    "econnrefused",
    "socket hang up",
    "fetch failed",
];

/// Retry on 429, any 5xx, or an error message that looks like a network
/// or timeout failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggressiveRetryPolicy;

impl RetryPolicy for AggressiveRetryPolicy {
    fn should_retry(&self, err: &GatewayError) -> bool {
        if let Some(status) = err.status() {
            return status == 429 || (500..600).contains(&status);
        }
        let message = err.to_string().to_lowercase();
        TRANSIENT_KEYWORDS.iter().any(|kw| message.contains(kw))
    }
}

/// Settings for [`with_retry`].
#[derive(Clone)]
pub struct RetryOptions<P> {
    /// Extra attempts after the first one. Default: 3.
    pub max_retries: u32,
    pub backoff: BackoffConfig,
    pub policy: P,
    pub on_retry: Option<RetryCallback>,
}

impl Default for RetryOptions<AggressiveRetryPolicy> {
    fn default() -> Self {
        Self::new(AggressiveRetryPolicy)
    }
}

impl<P: RetryPolicy> RetryOptions<P> {
    pub fn new(policy: P) -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffConfig::new(Duration::from_millis(1000), Duration::from_millis(10_000), 2.0),
            policy,
            on_retry: None,
        }
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn on_retry(mut self, callback: impl Fn(u32, &GatewayError) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(std::sync::Arc::new(callback));
        self
    }
}

/// Run `op` until it succeeds, fails with an error `options.policy`
/// rejects, or retries run out.
///
/// Non-retryable errors come back unchanged; exhaustion wraps the last
/// error in [`GatewayError::RetriesExhausted`].
pub async fn with_retry<T, P, F, Fut>(options: &RetryOptions<P>, mut op: F) -> Result<T>
where
    P: RetryPolicy,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !options.policy.should_retry(&err) => return Err(err),
            Err(err) => err,
        };

        if attempt >= options.max_retries {
            return Err(GatewayError::RetriesExhausted {
                attempts: attempt + 1,
                last: Box::new(err),
            });
        }

        let delay = options.backoff.delay_for_attempt(attempt);
        attempt += 1;
        HTTP_RETRIES.inc();
        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "operation failed, retrying");
        if let Some(on_retry) = &options.on_retry {
            on_retry(attempt, &err);
        }
        tokio::time::sleep(delay).await;
    }
}

/// HTTP helper built on [`with_retry`]: every non-2xx response becomes a
/// [`GatewayError::Status`] and is classified by the policy.
pub async fn fetch_with_policy<T, P>(
    transport: &T,
    request: &FetchRequest,
    options: &RetryOptions<P>,
) -> Result<FetchResponse>
where
    T: Transport + ?Sized,
    P: RetryPolicy,
{
    with_retry(options, || async move {
        let response = transport.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Status {
                status: response.status,
                body: response.text(),
            })
        }
    })
    .await
}
