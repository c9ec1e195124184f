use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::Result;
use crate::memory::{ConversationMemory, WorkflowStep};
use crate::models::{MemoryResponse, RecordStepRequest};
use crate::state::AppState;

fn view(memory: ConversationMemory) -> MemoryResponse {
    MemoryResponse {
        next_step: memory.next_step(),
        memory,
    }
}

pub async fn get_memory_handler(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<MemoryResponse>> {
    let memory = state.memory.memory(&conversation_id).await?;
    Ok(Json(view(memory)))
}

pub async fn record_step_handler(
    State(state): State<Arc<AppState>>,
    Path((conversation_id, step)): Path<(String, WorkflowStep)>,
    Json(payload): Json<RecordStepRequest>,
) -> Result<Json<MemoryResponse>> {
    let memory = state
        .memory
        .record(&conversation_id, step, payload.value)
        .await?;
    Ok(Json(view(memory)))
}

pub async fn reset_memory_handler(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode> {
    state.memory.reset(&conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
