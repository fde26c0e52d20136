//! Cache storage implementations.

use std::{num::NonZeroUsize, sync::RwLock, time::Duration};

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::lock::recover;

/// Time-boxed storage for rendered pages.
pub trait PageCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String, ttl: Duration);

    /// Drop every entry regardless of remaining lifetime.
    fn clear(&self);
}

struct Entry {
    body: String,
    expires_at: Instant,
}

/// LRU-bounded cache whose entries expire after their own TTL.
///
/// Expiry reads the tokio clock so tests can drive it with a paused runtime.
pub struct TtlPageCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl TtlPageCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        recover(self.entries.read(), "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageCache for TtlPageCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = recover(self.entries.write(), "get");
        let now = Instant::now();

        let lookup = entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.body.clone()));
        let hit = match lookup {
            Some(Some(body)) => Some(body),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        if hit.is_some() {
            counter!("inkwell_home_cache_hit_total").increment(1);
        } else {
            counter!("inkwell_home_cache_miss_total").increment(1);
        }
        hit
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            body: value,
            expires_at: Instant::now() + ttl,
        };
        recover(self.entries.write(), "set").put(key.to_string(), entry);
    }

    fn clear(&self) {
        recover(self.entries.write(), "clear").clear();
    }
}

/// Cache used when caching is disabled: never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPageCache;

impl PageCache for NoopPageCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String, _ttl: Duration) {}

    fn clear(&self) {}
}
