//! Tests for [`ScrapeCache`] TTL, normalization and eviction.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use content_gateway::scrape_cache::{Clock, ScrapeCache, ScrapeCacheConfig};
use serde_json::json;

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        })
    }

    fn advance(&self, delta: TimeDelta) {
        *self.now.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn cache_with(clock: &Arc<ManualClock>, config: ScrapeCacheConfig) -> ScrapeCache {
    ScrapeCache::with_clock(config, Arc::clone(clock) as Arc<dyn Clock>)
}

#[test]
fn set_then_get_returns_entry() {
    let clock = ManualClock::new();
    let cache = cache_with(&clock, ScrapeCacheConfig::default());

    cache.set("https://a.com", "content", json!({"title": "A"}), None, None);
    let entry = cache.get("https://a.com").unwrap();

    assert_eq!(entry.content, "content");
    assert_eq!(entry.metadata["title"], "A");
    assert_eq!(entry.url, "https://a.com");
}

#[test]
fn entry_expires_after_ttl() {
    let clock = ManualClock::new();
    let cache = cache_with(&clock, ScrapeCacheConfig::default());
    cache.set("https://a.com", "content", json!({}), None, None);

    clock.advance(TimeDelta::days(6));
    assert!(cache.get("https://a.com").is_some());

    clock.advance(TimeDelta::days(2));
    assert!(cache.get("https://a.com").is_none());
    assert_eq!(cache.len(), 0);
}

#[test]
fn entry_at_exactly_ttl_is_still_fresh() {
    let clock = ManualClock::new();
    let cache = cache_with(&clock, ScrapeCacheConfig::default());
    cache.set("a.com", "content", json!({}), None, None);

    clock.advance(TimeDelta::days(7));
    assert!(cache.get("a.com").is_some());
}

#[test]
fn protocol_slash_and_case_share_a_key() {
    let clock = ManualClock::new();
    let cache = cache_with(&clock, ScrapeCacheConfig::default());

    cache.set("https://A.com/", "content", json!({}), None, None);

    assert_eq!(cache.get("http://a.com").unwrap().content, "content");
    assert!(cache.get("a.com").is_some());
    assert!(cache.get("https://a.com/other").is_none());
}

#[test]
fn overflow_evicts_single_oldest_entry() {
    let clock = ManualClock::new();
    let cache = cache_with(
        &clock,
        ScrapeCacheConfig {
            ttl: Duration::from_secs(3600),
            max_entries: 2,
        },
    );

    cache.set("a.com", "a", json!({}), None, None);
    clock.advance(TimeDelta::seconds(1));
    cache.set("b.com", "b", json!({}), None, None);
    clock.advance(TimeDelta::seconds(1));
    // reading does not refresh: eviction is by insertion time
    assert!(cache.get("a.com").is_some());
    cache.set("c.com", "c", json!({}), None, None);

    assert_eq!(cache.len(), 2);
    assert!(cache.get("a.com").is_none());
    assert!(cache.get("b.com").is_some());
    assert!(cache.get("c.com").is_some());
}

#[test]
fn overwrite_does_not_evict() {
    let clock = ManualClock::new();
    let cache = cache_with(
        &clock,
        ScrapeCacheConfig {
            ttl: Duration::from_secs(3600),
            max_entries: 2,
        },
    );

    cache.set("a.com", "a", json!({}), None, None);
    clock.advance(TimeDelta::seconds(1));
    cache.set("b.com", "b", json!({}), None, None);
    cache.set("https://a.com/", "a2", json!({}), None, None);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a.com").unwrap().content, "a2");
}

#[test]
fn stats_and_clear() {
    let clock = ManualClock::new();
    let cache = cache_with(&clock, ScrapeCacheConfig::default());
    assert_eq!(cache.stats().entries, 0);
    assert_eq!(cache.stats().avg_age_hours, 0.0);

    cache.set(
        "a.com",
        "12345",
        json!({}),
        Some(json!({"founded": 2019})),
        Some("fetch".into()),
    );
    clock.advance(TimeDelta::hours(2));
    cache.set("b.com", "123", json!({}), None, None);

    let stats = cache.stats();
    assert_eq!(stats.entries, 2);
    // content + "{}" metadata + facts JSON
    assert_eq!(stats.total_size_bytes, 5 + 2 + r#"{"founded":2019}"#.len() + 3 + 2);
    assert!((stats.avg_age_hours - 1.0).abs() < 1e-9);

    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.get("a.com").is_none());
}
