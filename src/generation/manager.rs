use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::key::build_key;
use crate::metrics::{GENERATION_CACHE_HITS, GENERATION_CACHE_MISSES, GENERATION_DEDUPED};

type SharedGeneration<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

// In-flight generation; `attempt` tells a fresh attempt apart from one
// orphaned by `clear_cache`
struct PendingEntry<T, E> {
    attempt: u64,
    handle: SharedGeneration<T, E>,
}

struct Inner<T, E> {
    cache: HashMap<String, T>,
    pending: HashMap<String, PendingEntry<T, E>>,
    completed: HashSet<String>,
    next_attempt: u64,
}

/// Counts reported by the admin endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub cached: usize,
    pub pending: usize,
    pub completed: usize,
}

/// Single-flight cache for LLM generations.
///
/// Each `(kind, params)` pair is in one of three states: absent, pending
/// (a producer is running) or completed (value cached). Concurrent callers
/// for the same pair share one producer run and observe the same result.
/// Failures are not cached; the next call starts over.
///
/// Producers run as tokio tasks, so a caller that goes away does not stall
/// the others attached to the same generation.
pub struct GenerationManager<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> GenerationManager<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cache: HashMap::new(),
                pending: HashMap::new(),
                completed: HashSet::new(),
                next_attempt: 0,
            })),
        }
    }

    /// Return the cached value for `(kind, params)`, join the in-flight
    /// generation, or run `producer` if neither exists.
    ///
    /// `producer` is only invoked on a miss. Its error is passed through
    /// unchanged to every caller attached to the attempt.
    pub async fn generate<F, Fut>(&self, kind: &str, params: &Value, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = build_key(kind, params);

        let handle = {
            let mut inner = self.inner.lock();

            if let Some(value) = inner.cache.get(&key) {
                GENERATION_CACHE_HITS.inc();
                debug!(%key, "generation cache hit");
                return Ok(value.clone());
            }

            let in_flight = inner.pending.get(&key).map(|p| p.handle.clone());
            match in_flight {
                Some(handle) => {
                    GENERATION_DEDUPED.inc();
                    debug!(%key, "joining in-flight generation");
                    handle
                }
                None => {
                    GENERATION_CACHE_MISSES.inc();
                    let attempt = inner.next_attempt;
                    inner.next_attempt += 1;
                    debug!(%key, attempt, "starting generation");

                    let handle = self.spawn_producer(key.clone(), attempt, producer);
                    inner.pending.insert(
                        key,
                        PendingEntry {
                            attempt,
                            handle: handle.clone(),
                        },
                    );
                    handle
                }
            }
        };

        handle.await
    }

    fn spawn_producer<F, Fut>(&self, key: String, attempt: u64, producer: F) -> SharedGeneration<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let settle = Settle {
            inner: Arc::clone(&self.inner),
            key,
            attempt,
            done: false,
        };

        let task = tokio::spawn(async move {
            let mut settle = settle;
            let result = producer().await;
            settle.finish(&result);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => match err.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    // only reachable while the runtime is shutting down
                    Err(err) => panic!("generation task cancelled: {err}"),
                },
            }
        }
        .boxed()
        .shared()
    }

    /// True while a producer for `(kind, params)` is running.
    pub fn is_generating(&self, kind: &str, params: &Value) -> bool {
        let key = build_key(kind, params);
        self.inner.lock().pending.contains_key(&key)
    }

    /// True once a generation for `(kind, params)` has succeeded.
    pub fn is_completed(&self, kind: &str, params: &Value) -> bool {
        let key = build_key(kind, params);
        self.inner.lock().completed.contains(&key)
    }

    /// Forget one cached generation. A running producer is left alone.
    pub fn invalidate(&self, kind: &str, params: &Value) {
        let key = build_key(kind, params);
        let mut inner = self.inner.lock();
        inner.cache.remove(&key);
        inner.completed.remove(&key);
    }

    /// Drop every cached value, pending entry and completion record.
    ///
    /// Running producers are not cancelled; their results still reach the
    /// callers already waiting on them but are never stored.
    pub fn clear_cache(&self) {
        let mut inner = self.inner.lock();
        inner.cache.clear();
        inner.pending.clear();
        inner.completed.clear();
    }

    pub fn stats(&self) -> GenerationStats {
        let inner = self.inner.lock();
        GenerationStats {
            cached: inner.cache.len(),
            pending: inner.pending.len(),
            completed: inner.completed.len(),
        }
    }
}

impl<T, E> Default for GenerationManager<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// Removes the pending entry when the producer task ends, including by panic.
// Only touches state that still belongs to this attempt.
struct Settle<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    key: String,
    attempt: u64,
    done: bool,
}

impl<T: Clone, E> Settle<T, E> {
    fn finish(&mut self, result: &Result<T, E>) {
        self.done = true;
        let mut inner = self.inner.lock();

        let current = inner
            .pending
            .get(&self.key)
            .is_some_and(|p| p.attempt == self.attempt);
        if !current {
            debug!(key = %self.key, attempt = self.attempt, "discarding result of cleared generation");
            return;
        }

        inner.pending.remove(&self.key);
        match result {
            Ok(value) => {
                inner.cache.insert(self.key.clone(), value.clone());
                inner.completed.insert(self.key.clone());
                debug!(key = %self.key, "generation completed");
            }
            Err(_) => debug!(key = %self.key, "generation failed"),
        }
    }
}

impl<T, E> Drop for Settle<T, E> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut inner = self.inner.lock();
        if inner
            .pending
            .get(&self.key)
            .is_some_and(|p| p.attempt == self.attempt)
        {
            inner.pending.remove(&self.key);
        }
    }
}
