use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Args;
use crate::error::{GatewayError, Result};
use crate::generation::GenerationManager;
use crate::llm::{LlmClient, LlmConfig};
use crate::memory::{FileStore, InMemoryStore, MemoryManager, MemoryStore};
use crate::rate_limit::RateLimiter;
use crate::retry::{FetchRetryConfig, ReqwestTransport, Transport};
use crate::scrape_cache::ScrapeCache;

// app's shared state, built once at startup and handed to every handler
pub struct AppState {
    pub generations: GenerationManager<String, GatewayError>,
    pub scrape_cache: ScrapeCache,
    pub memory: MemoryManager,
    pub llm: LlmClient,
    // transport + retry settings for page fetches
    pub transport: Arc<dyn Transport>,
    pub retry: FetchRetryConfig,
    pub rate_limiter: RateLimiter,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn from_args(args: &Args) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("content-gateway/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Configuration(format!("http client: {e}")))?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(client));
        let retry = args.retry_config();

        let llm = LlmClient::new(
            Arc::clone(&transport),
            LlmConfig {
                base_url: args.llm_url.clone(),
                api_key: args.llm_api_key.clone(),
                model: args.llm_model.clone(),
                temperature: args.llm_temperature,
            },
            retry.clone(),
        );

        let store: Arc<dyn MemoryStore> = match &args.memory_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "conversation memory stored on disk");
                Arc::new(FileStore::new(dir))
            }
            None => Arc::new(InMemoryStore::new()),
        };

        Ok(Self {
            generations: GenerationManager::new(),
            scrape_cache: ScrapeCache::new(args.scrape_cache_config()),
            memory: MemoryManager::new(store),
            llm,
            transport,
            retry,
            rate_limiter: RateLimiter::new(args.rate_limit, args.rate_window()),
            admin_token: args.admin_token.clone(),
        })
    }
}
