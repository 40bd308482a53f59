//! Time-bounded, lazily refreshed in-memory caches.
//!
//! An entry is served as-is until its TTL elapses; the next read after that
//! refetches and swaps the whole entry. When a refetch fails, or comes back
//! empty, the previous value keeps being served. Concurrent misses are not
//! coalesced: each may fetch, and the last one to finish wins.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Payload types that can tell whether a fetch produced anything usable.
pub trait Cacheable {
    fn is_empty(&self) -> bool {
        false
    }
}

impl<T> Cacheable for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

/// A cached value together with when it was fetched.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub payload: Arc<T>,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(payload: T, ttl: Duration) -> Self {
        Self {
            payload: Arc::new(payload),
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.fetched_at) < self.ttl
    }
}

enum Settled<T, E> {
    Store(T),
    Serve(Arc<T>),
    Fail(E),
}

fn settle<T: Cacheable, E: Display>(
    name: &str,
    fetched: Result<T, E>,
    stale: Option<Arc<T>>,
) -> Settled<T, E> {
    match (fetched, stale) {
        (Ok(value), _) if !value.is_empty() => Settled::Store(value),
        (Ok(_), Some(old)) => {
            warn!(cache = name, "Refresh returned nothing, serving stale value");
            Settled::Serve(old)
        }
        (Ok(value), None) => {
            warn!(cache = name, "Refresh returned nothing and no previous value exists");
            Settled::Serve(Arc::new(value))
        }
        (Err(e), Some(old)) => {
            warn!(cache = name, error = %e, "Refresh failed, serving stale value");
            Settled::Serve(old)
        }
        (Err(e), None) => Settled::Fail(e),
    }
}

/// A single cached value.
pub struct TtlCell<T> {
    name: &'static str,
    ttl: Duration,
    slot: RwLock<Option<Arc<CacheEntry<T>>>>,
}

impl<T: Cacheable> TtlCell<T> {
    /// Creates an empty cell.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Current value if it has not expired.
    pub async fn fresh(&self) -> Option<Arc<T>> {
        let now = Instant::now();
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|e| e.is_fresh(now))
            .map(|e| e.payload.clone())
    }

    /// Current value regardless of age.
    pub async fn current(&self) -> Option<Arc<T>> {
        self.slot.read().await.as_ref().map(|e| e.payload.clone())
    }

    /// Returns the cached value, calling `fetch` if it is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns the fetch error only when there is no previous value to fall
    /// back to.
    pub async fn get_or_refresh<F, Fut, E>(&self, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if let Some(hit) = self.fresh().await {
            return Ok(hit);
        }

        debug!(cache = self.name, "Cache miss, refreshing");
        let fetched = fetch().await;
        match settle(self.name, fetched, self.current().await) {
            Settled::Store(value) => {
                let entry = Arc::new(CacheEntry::new(value, self.ttl));
                let payload = entry.payload.clone();
                *self.slot.write().await = Some(entry);
                Ok(payload)
            }
            Settled::Serve(value) => Ok(value),
            Settled::Fail(e) => Err(e),
        }
    }
}

/// One independently expiring value per key.
pub struct KeyedTtlCache<K, T> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<HashMap<K, Arc<CacheEntry<T>>>>,
}

impl<K, T> KeyedTtlCache<K, T>
where
    K: Eq + Hash + Clone,
    T: Cacheable,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, key: &K) -> Option<Arc<CacheEntry<T>>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Returns the value for `key`, calling `fetch` if it is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns the fetch error only when `key` has no previous value.
    pub async fn get_or_refresh<F, Fut, E>(&self, key: &K, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let existing = self.entry(key).await;
        if let Some(entry) = existing.as_ref().filter(|e| e.is_fresh(Instant::now())) {
            return Ok(entry.payload.clone());
        }

        debug!(cache = self.name, "Cache miss, refreshing");
        let fetched = fetch().await;
        match settle(self.name, fetched, existing.map(|e| e.payload.clone())) {
            Settled::Store(value) => {
                let entry = Arc::new(CacheEntry::new(value, self.ttl));
                let payload = entry.payload.clone();
                self.entries.write().await.insert(key.clone(), entry);
                Ok(payload)
            }
            Settled::Serve(value) => Ok(value),
            Settled::Fail(e) => Err(e),
        }
    }
}
