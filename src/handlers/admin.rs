use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum::{Json, extract::State};
use tracing::{info, warn};

use crate::error::{GatewayError, Result};
use crate::models::{CacheSnapshot, ClearCacheResponse};
use crate::state::AppState;

// Operator-only: requires `Authorization: Bearer <admin token>`
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(GatewayError::AdminDisabled);
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => {
            warn!("rejected admin request with missing or invalid token");
            Err(GatewayError::Unauthorized)
        }
    }
}

// Auth scheme names are case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim_start())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn snapshot(state: &AppState) -> CacheSnapshot {
    CacheSnapshot {
        generation: state.generations.stats(),
        scrape: state.scrape_cache.stats(),
    }
}

pub async fn clear_cache_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ClearCacheResponse>> {
    authorize(&state, &headers)?;

    let before = snapshot(&state);
    state.generations.clear_cache();
    state.scrape_cache.clear();
    let after = snapshot(&state);

    info!(
        generations = before.generation.cached,
        scraped_pages = before.scrape.entries,
        "caches cleared"
    );
    Ok(Json(ClearCacheResponse {
        success: true,
        before,
        after,
    }))
}
