use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("content_gateway_requests_total", "Total number of generate requests").unwrap();
    pub static ref GENERATION_CACHE_HITS: Counter =
        register_counter!("content_gateway_generation_cache_hits_total", "Generations served from cache").unwrap();
    pub static ref GENERATION_CACHE_MISSES: Counter =
        register_counter!("content_gateway_generation_cache_misses_total", "Generations that ran a producer").unwrap();
    pub static ref GENERATION_DEDUPED: Counter =
        register_counter!("content_gateway_generation_deduped_total", "Callers attached to an in-flight generation").unwrap();
    pub static ref SCRAPE_CACHE_HITS: Counter =
        register_counter!("content_gateway_scrape_cache_hits_total", "Scrape cache hits").unwrap();
    pub static ref SCRAPE_CACHE_MISSES: Counter =
        register_counter!("content_gateway_scrape_cache_misses_total", "Scrape cache misses").unwrap();
    pub static ref SCRAPE_CACHE_SIZE: Gauge =
        register_gauge!("content_gateway_scrape_cache_size", "Current number of scraped pages in cache").unwrap();
    pub static ref HTTP_RETRIES: Counter =
        register_counter!("content_gateway_http_retries_total", "Retried outbound calls").unwrap();
    pub static ref LLM_LATENCY: Histogram = register_histogram!(
        "content_gateway_llm_latency_seconds",
        "LLM completion latency in seconds"
    )
    .unwrap();
}
