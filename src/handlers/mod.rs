mod admin;
mod generate;
mod health;
mod memory;
mod metrics;
mod scrape;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};

pub use admin::clear_cache_handler;
pub use generate::{generate_handler, status_handler};
pub use health::health_handler;
pub use memory::{get_memory_handler, record_step_handler, reset_memory_handler};
pub use metrics::metrics_handler;
pub use scrape::scrape_handler;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/generate/status", post(status_handler))
        .route("/api/scrape", post(scrape_handler))
        .route(
            "/api/conversations/{id}/memory",
            get(get_memory_handler).delete(reset_memory_handler),
        )
        .route("/api/conversations/{id}/steps/{step}", put(record_step_handler))
        .route(
            "/api/admin/clear-cache",
            get(clear_cache_handler).post(clear_cache_handler),
        )
        .with_state(state)
}
