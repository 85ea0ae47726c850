//! In-memory session cache for backend responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Defines the behavior of the in-memory cache for a backend call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Read from the cache if a live entry is present;
    /// otherwise, fetch from the network and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry,
    /// and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now <= expires_at)
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, CacheEntry<V>>,
    ttl: Option<Duration>,
}

/// Thread-safe keyed cache. Without a TTL, entries live for the whole session.
#[derive(Debug)]
pub struct CacheStore<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> CacheStore<V> {
    /// Entries expire `ttl` after insertion.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::build(Some(ttl))
    }

    /// Entries never expire; the cache lives as long as the session.
    pub fn session() -> Self {
        Self::build(None)
    }

    fn build(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    /// Live value for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<V> {
        let store = self.inner.read().await;
        let now = Instant::now();
        store
            .map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: impl Into<String>, value: V) {
        let mut store = self.inner.write().await;
        let expires_at = store.ttl.map(|ttl| Instant::now() + ttl);
        store.map.insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Remove expired entries from the cache.
    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        let now = Instant::now();
        store.map.retain(|_, entry| entry.is_live(now));
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries, including expired ones not yet cleared.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
