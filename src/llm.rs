//! Client for an OpenAI-compatible chat completion endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{GatewayError, Result};
use crate::metrics::LLM_LATENCY;
use crate::models::{ChatMessage, CompletionRequest, CompletionResponse};
use crate::prompts::GenerationKind;
use crate::retry::{FetchRequest, FetchRetryConfig, Transport, fetch_json_with_retry};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
}

#[derive(Clone)]
pub struct LlmClient {
    transport: Arc<dyn Transport>,
    config: LlmConfig,
    retry: FetchRetryConfig,
}

impl LlmClient {
    pub fn new(transport: Arc<dyn Transport>, config: LlmConfig, retry: FetchRetryConfig) -> Self {
        Self {
            transport,
            config,
            retry,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send one system + user exchange and return the reply text.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            temperature: self.config.temperature,
        };
        let mut request = FetchRequest::post_json(self.completions_url(), &body)?.timeout(COMPLETION_TIMEOUT);
        if let Some(key) = &self.config.api_key {
            request = request.header("authorization", format!("Bearer {key}"));
        }

        let start = Instant::now();
        debug!(model = %self.config.model, "sending completion request");
        let response: CompletionResponse =
            fetch_json_with_retry(self.transport.as_ref(), request, &self.retry).await?;
        LLM_LATENCY.observe(start.elapsed().as_secs_f64());

        let served_model = response.model.unwrap_or_else(|| self.config.model.clone());
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GatewayError::EmptyResponse)?;

        info!(
            model = %served_model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "completion received"
        );
        Ok(content)
    }

    pub async fn generate(&self, kind: GenerationKind, params: &Value) -> Result<String> {
        self.complete(&kind.system_prompt(), &kind.user_prompt(params))
            .await
    }
}
