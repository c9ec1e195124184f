//! Caching LLM gateway for a B2B marketing-content application.
//!
//! Website scrapes are cached with a TTL, LLM generations are
//! deduplicated and cached per `(type, params)`, outbound calls retry with
//! exponential backoff, and each conversation's workflow progress is
//! tracked in a pluggable store.

pub mod config;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod llm;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod prompts;
pub mod rate_limit;
pub mod retry;
pub mod scrape_cache;
pub mod state;

pub use error::{GatewayError, Result};
pub use generation::{GenerationManager, GenerationStats, build_key};
pub use scrape_cache::ScrapeCache;
pub use state::AppState;
