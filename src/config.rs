use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::retry::{BackoffConfig, FetchRetryConfig};
use crate::scrape_cache::ScrapeCacheConfig;

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "content-gateway")]
#[command(about = "Caching LLM gateway for marketing content generation")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    // Base url of the OpenAI-compatible completion API
    #[arg(long, env = "GATEWAY_LLM_URL", default_value = "https://api.openai.com")]
    pub llm_url: String,

    #[arg(long, env = "GATEWAY_LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    #[arg(long, env = "GATEWAY_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "GATEWAY_LLM_TEMPERATURE")]
    pub llm_temperature: Option<f32>,

    // Bearer token for /api/admin/*; admin endpoints are disabled without it
    #[arg(long, env = "GATEWAY_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    // Scrape cache TTL in hours
    #[arg(long, env = "GATEWAY_SCRAPE_TTL_HOURS", default_value_t = 168)]
    pub scrape_ttl_hours: u64,

    #[arg(long, env = "GATEWAY_SCRAPE_MAX_ENTRIES", default_value_t = 1000)]
    pub scrape_max_entries: usize,

    // Retries after the first attempt for outbound calls
    #[arg(long, env = "GATEWAY_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    #[arg(long, env = "GATEWAY_MIN_TIMEOUT_MS", default_value_t = 1000)]
    pub min_timeout_ms: u64,

    #[arg(long, env = "GATEWAY_MAX_TIMEOUT_MS", default_value_t = 30_000)]
    pub max_timeout_ms: u64,

    #[arg(long, env = "GATEWAY_BACKOFF_FACTOR", default_value_t = 2.0)]
    pub backoff_factor: f64,

    // Rate limit max generate requests per window
    #[arg(long, env = "GATEWAY_RATE_LIMIT", default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "GATEWAY_RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Directory for conversation memory files; in-memory when unset
    #[arg(long, env = "GATEWAY_MEMORY_DIR")]
    pub memory_dir: Option<PathBuf>,
}

impl Args {
    pub fn retry_config(&self) -> FetchRetryConfig {
        FetchRetryConfig::new()
            .max_retries(self.max_retries)
            .backoff(BackoffConfig::new(
                Duration::from_millis(self.min_timeout_ms),
                Duration::from_millis(self.max_timeout_ms),
                self.backoff_factor,
            ))
    }

    pub fn scrape_cache_config(&self) -> ScrapeCacheConfig {
        ScrapeCacheConfig {
            ttl: Duration::from_secs(self.scrape_ttl_hours.saturating_mul(3600)),
            max_entries: self.scrape_max_entries,
        }
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["content-gateway"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.scrape_cache_config().ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(args.scrape_cache_config().max_entries, 1000);

        let retry = args.retry_config();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.backoff, BackoffConfig::default());
    }

    #[test]
    fn flags_override() {
        let args = Args::try_parse_from([
            "content-gateway",
            "--port",
            "9000",
            "--max-retries",
            "2",
            "--admin-token",
            "secret",
        ])
        .unwrap();
        assert_eq!(args.port, 9000);
        assert_eq!(args.retry_config().max_retries, 2);
        assert_eq!(args.admin_token.as_deref(), Some("secret"));
    }

    #[test]
    fn huge_scrape_ttl_saturates() {
        let hours = u64::MAX.to_string();
        let args =
            Args::try_parse_from(["content-gateway", "--scrape-ttl-hours", hours.as_str()]).unwrap();
        assert_eq!(args.scrape_cache_config().ttl, Duration::from_secs(u64::MAX));
    }
}
