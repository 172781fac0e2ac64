//! Bounded cache of pot deadlines and balances between scans
//!
//! Entries expire after a TTL and the least recently used pot is evicted once the
//! capacity is reached. The cache only decides whether a chain read can be skipped;
//! a pot whose cached deadline has passed is always re-read before any action.

use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;

use crate::core::{CachedPotState, PotId};

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    state: CachedPotState,
    recorded_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStatistics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct PotStateCache {
    entries: LruCache<PotId, CacheEntry>,
    ttl_secs: u64,
    hits: u64,
    misses: u64,
}

impl PotStateCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl_secs: ttl.as_secs(),
            hits: 0,
            misses: 0,
        }
    }

    /// Fresh cached state for `pot_id` as of `now` (unix seconds)
    pub fn lookup(&mut self, pot_id: PotId, now: u64) -> Option<CachedPotState> {
        let fresh = match self.entries.get(&pot_id).copied() {
            Some(entry) if now.saturating_sub(entry.recorded_at) < self.ttl_secs => {
                Some(entry.state)
            }
            Some(_) => {
                self.entries.pop(&pot_id);
                debug!(pot_id, "Cached pot state expired");
                None
            }
            None => None,
        };

        match fresh {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        fresh
    }

    pub fn record(&mut self, pot_id: PotId, state: CachedPotState, now: u64) {
        self.entries.put(
            pot_id,
            CacheEntry {
                state,
                recorded_at: now,
            },
        );
    }

    pub fn invalidate(&mut self, pot_id: PotId) {
        self.entries.pop(&pot_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
            capacity: self.entries.cap().get(),
        }
    }
}
