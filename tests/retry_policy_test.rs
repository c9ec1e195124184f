//! Tests for `with_retry` and the two retry policies.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use content_gateway::GatewayError;
use content_gateway::retry::{
    AggressiveRetryPolicy, ConservativeRetryPolicy, FetchRequest, FetchResponse, RetryOptions,
    Transport, fetch_with_policy, with_retry,
};

fn status(status: u16) -> GatewayError {
    GatewayError::Status {
        status,
        body: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn retries_transient_errors_then_succeeds() {
    let calls = AtomicU32::new(0);
    let counter = &calls;

    let result = with_retry(&RetryOptions::default(), || async move {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < 2 { Err(status(503)) } else { Ok("done") }
    })
    .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_error_is_returned_unchanged() {
    let calls = AtomicU32::new(0);
    let counter = &calls;

    let result: content_gateway::Result<()> = with_retry(&RetryOptions::default(), || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(status(401))
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err().status(), Some(401));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_retries() {
    let calls = AtomicU32::new(0);
    let counter = &calls;
    let retried = Arc::new(AtomicU32::new(0));
    let options = {
        let retried = Arc::clone(&retried);
        RetryOptions::default()
            .max_retries(2)
            .on_retry(move |_, _| {
                retried.fetch_add(1, Ordering::SeqCst);
            })
    };

    let result: content_gateway::Result<()> = with_retry(&options, || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::Transport("network unreachable".into()))
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(retried.load(Ordering::SeqCst), 2);
    assert!(matches!(
        result,
        Err(GatewayError::RetriesExhausted { attempts: 3, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn conservative_policy_treats_server_errors_as_final() {
    let calls = AtomicU32::new(0);
    let counter = &calls;
    let options = RetryOptions::new(ConservativeRetryPolicy);

    let result: content_gateway::Result<()> = with_retry(&options, || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(status(500))
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err().status(), Some(500));
}

struct Flaky {
    statuses: Vec<u16>,
    calls: AtomicU32,
}

#[async_trait]
impl Transport for Flaky {
    async fn execute(&self, _request: &FetchRequest) -> content_gateway::Result<FetchResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let status = self.statuses[n.min(self.statuses.len() - 1)];
        Ok(FetchResponse::new(status, "ok"))
    }
}

#[tokio::test(start_paused = true)]
async fn fetch_with_policy_retries_5xx_under_aggressive_policy() {
    let transport = Flaky {
        statuses: vec![502, 500, 200],
        calls: AtomicU32::new(0),
    };
    let request = FetchRequest::get("https://acme.example");

    let response = fetch_with_policy(&transport, &request, &RetryOptions::new(AggressiveRetryPolicy))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn fetch_with_policy_surfaces_client_errors() {
    let transport = Flaky {
        statuses: vec![404],
        calls: AtomicU32::new(0),
    };
    let request = FetchRequest::get("https://acme.example/missing");

    let err = fetch_with_policy(&transport, &request, &RetryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}
