//! Tests for `fetch_with_retry` / `fetch_json_with_retry` against a
//! scripted transport.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use content_gateway::GatewayError;
use content_gateway::retry::{
    BackoffConfig, FetchRequest, FetchResponse, FetchRetryConfig, Transport, fetch_json_with_retry,
    fetch_with_retry,
};
use serde::Deserialize;
use tokio::time::Instant;

/// Replays a fixed script of outcomes, repeating the last one.
struct ScriptedTransport {
    script: Vec<Result<u16, String>>,
    calls: AtomicU32,
    seen_headers: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<u16, String>>) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
            seen_headers: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &FetchRequest) -> content_gateway::Result<FetchResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        self.seen_headers.lock().unwrap().push(request.headers.clone());
        let step = self.script[n.min(self.script.len() - 1)].clone();
        match step {
            Ok(status) => Ok(FetchResponse::new(status, format!(r#"{{"status":{status}}}"#))),
            Err(message) => Err(GatewayError::Transport(message)),
        }
    }
}

fn request() -> FetchRequest {
    FetchRequest::get("https://llm.example/v1/chat/completions")
}

#[tokio::test(start_paused = true)]
async fn retries_429_until_success() {
    let transport = ScriptedTransport::new(vec![Ok(429), Ok(429), Ok(200)]);
    let start = Instant::now();

    let response = fetch_with_retry(&transport, &request(), &FetchRetryConfig::default())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 3);
    // 1s after attempt 0, 2s after attempt 1
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn retries_408_and_network_errors() {
    let transport = ScriptedTransport::new(vec![
        Err("connection reset".into()),
        Ok(408),
        Ok(204),
    ]);

    let response = fetch_with_retry(&transport, &request(), &FetchRetryConfig::default())
        .await
        .unwrap();

    assert_eq!(response.status, 204);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn returns_404_immediately() {
    let transport = ScriptedTransport::new(vec![Ok(404)]);

    let response = fetch_with_retry(&transport, &request(), &FetchRetryConfig::default())
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_not_retried() {
    let transport = ScriptedTransport::new(vec![Ok(503), Ok(200)]);

    let response = fetch_with_retry(&transport, &request(), &FetchRetryConfig::default())
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_wraps_last_error() {
    let transport = ScriptedTransport::new(vec![Ok(429)]);
    let config = FetchRetryConfig::new().max_retries(2);

    let err = fetch_with_retry(&transport, &request(), &config)
        .await
        .unwrap_err();

    assert_eq!(transport.calls(), 3);
    match err {
        GatewayError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status(), Some(429));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_retries_makes_one_attempt() {
    let transport = ScriptedTransport::new(vec![Err("dns failure".into())]);
    let config = FetchRetryConfig::new().max_retries(0);

    let err = fetch_with_retry(&transport, &request(), &config)
        .await
        .unwrap_err();

    assert_eq!(transport.calls(), 1);
    assert!(matches!(err, GatewayError::RetriesExhausted { attempts: 1, .. }));
}

#[tokio::test(start_paused = true)]
async fn callbacks_fire_before_each_retry() {
    let transport = ScriptedTransport::new(vec![Ok(429), Err("timeout".into()), Ok(200)]);
    let retries = Arc::new(Mutex::new(Vec::new()));
    let progress = Arc::new(Mutex::new(Vec::new()));

    let config = {
        let retries = Arc::clone(&retries);
        let progress = Arc::clone(&progress);
        FetchRetryConfig::new()
            .on_retry(move |attempt, err| retries.lock().unwrap().push((attempt, err.status())))
            .on_progress(move |msg| progress.lock().unwrap().push(msg.to_string()))
    };

    fetch_with_retry(&transport, &request(), &config).await.unwrap();

    assert_eq!(*retries.lock().unwrap(), vec![(1, Some(429)), (2, None)]);
    let progress = progress.lock().unwrap();
    assert_eq!(progress.len(), 2);
    assert!(progress[0].contains("1000ms"));
    assert!(progress[1].contains("2000ms"));
}

#[tokio::test(start_paused = true)]
async fn delays_follow_backoff_and_ceiling() {
    let transport = ScriptedTransport::new(vec![Ok(429)]);
    let config = FetchRetryConfig::new().max_retries(6).backoff(BackoffConfig::new(
        Duration::from_millis(1000),
        Duration::from_millis(3000),
        2.0,
    ));
    let start = Instant::now();

    let _ = fetch_with_retry(&transport, &request(), &config).await;

    // 1000 + 2000 + 3000 * 4
    assert_eq!(transport.calls(), 7);
    assert!(start.elapsed() >= Duration::from_millis(15_000));
    assert!(start.elapsed() < Duration::from_millis(16_000));
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: u16,
}

#[tokio::test(start_paused = true)]
async fn json_variant_adds_content_type_and_parses() {
    let transport = ScriptedTransport::new(vec![Ok(429), Ok(200)]);

    let body: StatusBody = fetch_json_with_retry(&transport, request(), &FetchRetryConfig::default())
        .await
        .unwrap();

    assert_eq!(body.status, 200);
    let seen = transport.seen_headers.lock().unwrap();
    assert!(
        seen.iter()
            .all(|h| h.iter().any(|(k, v)| k == "content-type" && v == "application/json"))
    );
}

#[tokio::test(start_paused = true)]
async fn json_variant_fails_on_error_status() {
    let transport = ScriptedTransport::new(vec![Ok(400)]);

    let err = fetch_json_with_retry::<StatusBody, _>(&transport, request(), &FetchRetryConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(transport.calls(), 1);
}
