//! Retry helpers for outbound calls.

pub mod backoff;
pub mod fetch;
pub mod policy;

pub use backoff::BackoffConfig;
pub use fetch::{
    FetchRequest, FetchResponse, FetchRetryConfig, ReqwestTransport, Transport,
    fetch_json_with_retry, fetch_with_retry,
};
pub use policy::{
    AggressiveRetryPolicy, ConservativeRetryPolicy, RetryOptions, RetryPolicy, fetch_with_policy,
    with_retry,
};
