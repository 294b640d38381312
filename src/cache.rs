/// TTL-bounded memoization of resolution results
///
/// In-process only: resolution evidence goes stale quickly and the system
/// carries no durable persistence, so entries live in a shared map with a
/// short TTL. Writes are whole-entry replacements (last-write-wins, no
/// merge); expired entries are dropped on read.
use crate::resolver::ResolveResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ResolveResult,
    expires_at: Instant,
}

/// Shared resolve-result cache, constructed once and injected
#[derive(Clone)]
pub struct ResolveCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResolveCache {
    /// Create a cache with the given entry TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Get a live entry; expired entries are removed and miss
    pub async fn get(&self, key: &str) -> Option<ResolveResult> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    debug!("Cache HIT: {}", key);
                    return Some(entry.result.clone());
                }
                Some(_) => {}
                None => {
                    debug!("Cache MISS: {}", key);
                    return None;
                }
            }
        }

        // Entry exists but expired; drop it under the write lock.
        debug!("Cache EXPIRED: {}", key);
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at <= Instant::now() {
                entries.remove(key);
            }
        }
        None
    }

    /// Store a result, replacing any existing entry wholesale
    pub async fn set(&self, key: &str, result: ResolveResult) {
        debug!("Cache SET: {} (TTL: {:?})", key, self.ttl);
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop all entries, forcing fresh resolution on the next lookup
    pub async fn clear(&self) {
        debug!("Cache CLEAR");
        self.entries.write().await.clear();
    }

    /// Number of stored entries (live and expired)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
