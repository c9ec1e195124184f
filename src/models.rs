use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generation::GenerationStats;
use crate::memory::{ConversationMemory, WorkflowStep};
use crate::scrape_cache::{CachedScrape, ScrapeCacheStats};

// OpenAI-compatible chat completion format
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CompletionChoice {
    pub message: ChatMessage,
}

// Gateway API: generation
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationStatus {
    pub generating: bool,
    pub completed: bool,
}

// Gateway API: scraping
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct ScrapeResponse {
    pub cached: bool,
    #[serde(flatten)]
    pub entry: CachedScrape,
}

// Gateway API: conversation memory
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RecordStepRequest {
    pub value: Value,
}

// Gateway API: admin
#[derive(Serialize, Clone, Copy, Debug)]
pub struct CacheSnapshot {
    pub generation: GenerationStats,
    pub scrape: ScrapeCacheStats,
}

#[derive(Serialize, Clone, Copy, Debug)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub before: CacheSnapshot,
    pub after: CacheSnapshot,
}

// Gateway API: conversation memory view
#[derive(Serialize, Clone, Debug)]
pub struct MemoryResponse {
    #[serde(flatten)]
    pub memory: ConversationMemory,
    pub next_step: Option<WorkflowStep>,
}
