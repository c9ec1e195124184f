//! HTTP fetch with retry on network failures, 408 and 429.
//!
//! Any other error status is handed back to the caller as a normal
//! response; only exhausting retries on a retryable condition produces an
//! error. Requests go through the [`Transport`] seam so tests can count and
//! script calls without a network.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backoff::BackoffConfig;
use super::policy::{ConservativeRetryPolicy, RetryPolicy};
use crate::error::{GatewayError, Result};
use crate::metrics::HTTP_RETRIES;

/// Outbound HTTP request, buffered so it can be replayed on retry.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST with `body` serialized as JSON.
    pub fn post_json<B: Serialize + ?Sized>(url: impl Into<String>, body: &B) -> Result<Self> {
        let mut request = Self::new(Method::POST, url);
        request.body = Some(serde_json::to_string(body)?);
        Ok(request)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

/// Fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Executes a single HTTP exchange.
///
/// An `Err` means no response was received (DNS, connect, reset, timeout).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

pub type RetryCallback = Arc<dyn Fn(u32, &GatewayError) + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Retry settings for [`fetch_with_retry`].
#[derive(Clone)]
pub struct FetchRetryConfig {
    /// Extra attempts after the first one. Default: 5.
    pub max_retries: u32,
    pub backoff: BackoffConfig,
    /// Called with the 1-based retry number before each retry.
    pub on_retry: Option<RetryCallback>,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for FetchRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffConfig::default(),
            on_retry: None,
            on_progress: None,
        }
    }
}

impl fmt::Debug for FetchRetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRetryConfig")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("on_retry", &self.on_retry.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl FetchRetryConfig {
    pub fn new() -> Self {
        Self::default()
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
        self.on_retry = Some(Arc::new(callback));
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// Send `request`, retrying network failures, 408 and 429 with backoff.
///
/// Status codes below 400 and non-retryable error statuses return
/// `Ok(response)` straight away. Running out of retries returns
/// [`GatewayError::RetriesExhausted`] wrapping the last failure.
pub async fn fetch_with_retry<T>(
    transport: &T,
    request: &FetchRequest,
    config: &FetchRetryConfig,
) -> Result<FetchResponse>
where
    T: Transport + ?Sized,
{
    let policy = ConservativeRetryPolicy;
    let mut attempt = 0u32;

    loop {
        let failure = match transport.execute(request).await {
            Ok(response) if response.status < 400 => return Ok(response),
            Ok(response) => {
                let err = GatewayError::Status {
                    status: response.status,
                    body: response.text(),
                };
                if !policy.should_retry(&err) {
                    debug!(url = %request.url, status = response.status, "non-retryable status");
                    return Ok(response);
                }
                err
            }
            Err(err) => err,
        };

        if attempt >= config.max_retries {
            warn!(url = %request.url, attempts = attempt + 1, error = %failure, "giving up on request");
            return Err(GatewayError::RetriesExhausted {
                attempts: attempt + 1,
                last: Box::new(failure),
            });
        }

        let delay = config.backoff.delay_for_attempt(attempt);
        attempt += 1;
        HTTP_RETRIES.inc();
        warn!(
            url = %request.url,
            attempt,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "retrying request"
        );

        if let Some(on_retry) = &config.on_retry {
            on_retry(attempt, &failure);
        }
        if let Some(on_progress) = &config.on_progress {
            on_progress(&format!(
                "Request failed ({failure}), retrying in {}ms ({attempt}/{})",
                delay.as_millis(),
                config.max_retries
            ));
        }

        tokio::time::sleep(delay).await;
    }
}

/// [`fetch_with_retry`] for JSON APIs.
///
/// Adds `content-type: application/json` unless already set, fails with
/// [`GatewayError::Status`] on a non-2xx final response and decodes the
/// body otherwise.
pub async fn fetch_json_with_retry<R, T>(
    transport: &T,
    request: FetchRequest,
    config: &FetchRetryConfig,
) -> Result<R>
where
    R: DeserializeOwned,
    T: Transport + ?Sized,
{
    let request = if request.has_header("content-type") {
        request
    } else {
        request.header("content-type", "application/json")
    };

    let response = fetch_with_retry(transport, &request, config).await?;
    if !response.is_success() {
        return Err(GatewayError::Status {
            status: response.status,
            body: response.text(),
        });
    }
    response.json()
}
