use std::sync::Arc;

use axum::http::HeaderMap;
use axum::{Json, extract::State};
use tracing::info;

use crate::error::{GatewayError, Result};
use crate::metrics::REQUEST_TOTAL;
use crate::models::{GenerateRequest, GenerateResponse, GenerationStatus};
use crate::prompts::GenerationKind;
use crate::state::AppState;

// Rate limit per forwarded client address, falling back to one global bucket
fn client_key(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("global")
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    REQUEST_TOTAL.inc();

    let kind: GenerationKind = payload.kind.parse()?;

    // cached generations cost nothing, so they skip the limiter
    if !state.generations.is_completed(kind.as_str(), &payload.params)
        && !state.rate_limiter.check(client_key(&headers))
    {
        return Err(GatewayError::RateLimited);
    }

    let llm = state.llm.clone();
    let params = payload.params.clone();
    let content = state
        .generations
        .generate(kind.as_str(), &payload.params, move || async move {
            llm.generate(kind, &params).await
        })
        .await?;

    info!(kind = %kind, chars = content.len(), "generation served");
    Ok(Json(GenerateResponse {
        kind: payload.kind,
        content,
    }))
}

pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerationStatus>> {
    let kind: GenerationKind = payload.kind.parse()?;

    Ok(Json(GenerationStatus {
        generating: state.generations.is_generating(kind.as_str(), &payload.params),
        completed: state.generations.is_completed(kind.as_str(), &payload.params),
    }))
}
