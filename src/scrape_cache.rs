//! TTL cache for scraped website content.
//!
//! Entries are keyed on a SHA-256 of the normalized URL, so
//! `https://A.com/` and `http://a.com` share a slot. Expiry is lazy: a
//! stale entry is dropped when a read finds it. After an insert pushes the
//! cache over capacity, the single oldest entry (by insertion time) goes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::metrics::{SCRAPE_CACHE_HITS, SCRAPE_CACHE_MISSES, SCRAPE_CACHE_SIZE};

/// 7 days
pub const DEFAULT_TTL: Duration = Duration::from_millis(604_800_000);
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Time source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedScrape {
    pub url: String,
    pub content: String,
    pub metadata: Value,
    pub facts_json: Option<Value>,
    pub source: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CachedScrape {
    fn size_bytes(&self) -> usize {
        self.content.len()
            + self.metadata.to_string().len()
            + self.facts_json.as_ref().map_or(0, |f| f.to_string().len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrapeCacheStats {
    pub entries: usize,
    pub total_size_bytes: usize,
    pub avg_age_hours: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScrapeCacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for ScrapeCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Lowercase, drop the scheme and one trailing slash.
pub fn normalize_url(url: &str) -> String {
    let lower = url.to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(lower.as_str());
    without_scheme
        .strip_suffix('/')
        .unwrap_or(without_scheme)
        .to_string()
}

// Create a cache key (hash of the normalized url)
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url));
    format!("{:x}", hasher.finalize())
}

pub struct ScrapeCache {
    entries: DashMap<String, CachedScrape>,
    ttl: TimeDelta,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl ScrapeCache {
    pub fn new(config: ScrapeCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ScrapeCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX),
            max_entries: config.max_entries,
            clock,
        }
    }

    fn is_expired(&self, entry: &CachedScrape, now: DateTime<Utc>) -> bool {
        now - entry.cached_at > self.ttl
    }

    /// Look up `url`, removing the entry if it has outlived the TTL.
    pub fn get(&self, url: &str) -> Option<CachedScrape> {
        let key = cache_key(url);
        let now = self.clock.now();

        let cached = self.entries.get(&key).map(|e| e.value().clone());
        match cached {
            Some(entry) if !self.is_expired(&entry, now) => {
                SCRAPE_CACHE_HITS.inc();
                debug!(url, "scrape cache hit");
                Some(entry)
            }
            Some(_) => {
                self.entries.remove_if(&key, |_, e| self.is_expired(e, now));
                SCRAPE_CACHE_MISSES.inc();
                SCRAPE_CACHE_SIZE.set(self.entries.len() as f64);
                debug!(url, "scrape cache entry expired");
                None
            }
            None => {
                SCRAPE_CACHE_MISSES.inc();
                None
            }
        }
    }

    /// Store a scraped page and return the stored entry.
    pub fn set(
        &self,
        url: &str,
        content: impl Into<String>,
        metadata: Value,
        facts_json: Option<Value>,
        source: Option<String>,
    ) -> CachedScrape {
        let entry = CachedScrape {
            url: url.to_string(),
            content: content.into(),
            metadata,
            facts_json,
            source,
            cached_at: self.clock.now(),
        };
        self.entries.insert(cache_key(url), entry.clone());

        if self.entries.len() > self.max_entries {
            self.evict_oldest();
        }
        SCRAPE_CACHE_SIZE.set(self.entries.len() as f64);
        entry
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().cached_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            if let Some((_, entry)) = self.entries.remove(&key) {
                debug!(url = %entry.url, "evicted oldest scrape cache entry");
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        SCRAPE_CACHE_SIZE.set(0.0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> ScrapeCacheStats {
        let now = self.clock.now();
        let mut total_size_bytes = 0;
        let mut total_age_ms = 0i64;
        let mut entries = 0;
        for entry in self.entries.iter() {
            entries += 1;
            total_size_bytes += entry.size_bytes();
            total_age_ms += (now - entry.cached_at).num_milliseconds();
        }
        let avg_age_hours = if entries == 0 {
            0.0
        } else {
            total_age_ms as f64 / entries as f64 / 3_600_000.0
        };
        ScrapeCacheStats {
            entries,
            total_size_bytes,
            avg_age_hours,
        }
    }
}
