//! Read-path response cache
//!
//! Volatile, cleared on restart. Responses are stored as JSON under a
//! fingerprint of the request that produced them and expire after a fixed
//! TTL. Writes never invalidate; readers accept staleness until expiry.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, CACHE_SIZE};

// =============================================================================
// Fingerprint
// =============================================================================

/// Canonical cache key for a read request
///
/// Derived from the uppercased method, the path, the query parameters sorted
/// by key then value, and the caller. Parameter order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(method: &str, path: &str, params: &[(&str, String)], caller: &str) -> Self {
        let mut sorted: Vec<(&str, &str)> = params
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        sorted.sort_unstable();

        let canonical = serde_json::json!({
            "method": method.to_ascii_uppercase(),
            "path": path,
            "params": sorted,
            "caller": caller,
        });

        let digest = Sha256::digest(canonical.to_string().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a cache read. A miss is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
}

// =============================================================================
// Store
// =============================================================================

/// Raw key/value backend for cached responses
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn put(&self, key: &str, value: String);

    fn entry_count(&self) -> u64;
}

/// In-process store backed by Moka with a fixed TTL
pub struct MemoryCacheStore {
    entries: Cache<String, String>,
}

impl MemoryCacheStore {
    /// # Arguments
    /// * `ttl` - Lifetime of every entry
    /// * `max_capacity` - Maximum number of entries before eviction
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).await
    }

    async fn put(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value).await;
    }

    fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

// =============================================================================
// Typed gateway
// =============================================================================

/// Typed cache-aside gateway over a [`CacheStore`]
///
/// Serialization problems are logged and treated as misses; they never fail
/// the read that triggered them.
pub struct ResponseCache {
    name: &'static str,
    store: Box<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(name: &'static str, store: Box<dyn CacheStore>) -> Self {
        Self { name, store }
    }

    pub fn in_memory(ttl: Duration, max_capacity: u64) -> Self {
        Self::new("responses", Box::new(MemoryCacheStore::new(ttl, max_capacity)))
    }

    pub async fn get<T: DeserializeOwned>(&self, fingerprint: &Fingerprint) -> CacheLookup<T> {
        let Some(raw) = self.store.get(fingerprint.as_str()).await else {
            CACHE_MISSES_TOTAL.with_label_values(&[self.name]).inc();
            return CacheLookup::Miss;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                CACHE_HITS_TOTAL.with_label_values(&[self.name]).inc();
                CacheLookup::Hit(value)
            }
            Err(error) => {
                tracing::warn!(%error, cache = self.name, "discarding undecodable cache entry");
                CACHE_MISSES_TOTAL.with_label_values(&[self.name]).inc();
                CacheLookup::Miss
            }
        }
    }

    pub async fn put<T: Serialize>(&self, fingerprint: &Fingerprint, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                self.store.put(fingerprint.as_str(), raw).await;
                CACHE_SIZE
                    .with_label_values(&[self.name])
                    .set(self.store.entry_count() as i64);
            }
            Err(error) => {
                tracing::warn!(%error, cache = self.name, "failed to serialize response for cache");
            }
        }
    }
}
