//! Response cache with TTL expiry
//!
//! Memoizes final answers keyed by a fingerprint of the normalized query
//! and the retrieval parameters. Entries expire after the configured TTL
//! and are purged lazily on the next lookup; there is no background sweep.
//! The cache is owned by the pipeline instance, never module-level state,
//! and supports concurrent reads and writes behind a mutex (writes are
//! idempotent overwrites, so no per-key locking is needed).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    pub ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Deterministic fingerprint of (normalized query, retrieval parameters,
/// language). The same logical query with the same parameters always maps
/// to the same key.
pub fn key_for(query: &str, n_tickets: usize, n_guides: usize, language: &str) -> String {
    let normalized = query.trim().to_lowercase();
    let input = format!("{normalized}_{n_tickets}_{n_guides}_{language}");
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

struct CacheEntry<V> {
    value: V,
    created_at: DateTime<Utc>,
}

pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(config.ttl_secs),
        }
    }

    /// Look up a cached value. Expired entries are evicted here and count
    /// as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Utc::now() - entry.created_at <= self.ttl => {
                tracing::debug!("Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                tracing::debug!("Cache entry expired, evicting");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or unconditionally overwrite, stamping the current time.
    pub fn put(&self, key: String, value: V) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Utc::now(),
            },
        );
        tracing::debug!(size = entries.len(), "Response cached");
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
