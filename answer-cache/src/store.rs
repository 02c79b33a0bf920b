use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A single cached value with its bookkeeping. An entry is logically
/// absent once `now > expires_at`; physical removal happens lazily on
/// read or during a cleanup sweep.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    hit_count: u64,
    last_accessed_at: DateTime<Utc>,
}

/// Read-only snapshot of a cache instance, recomputed on demand.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub capacity: usize,
    pub total_hits: u64,
    pub total_misses: u64,
    pub hit_rate: f64,
    pub oldest_entry_at: Option<DateTime<Utc>>,
    pub newest_entry_at: Option<DateTime<Utc>>,
}

/// Key-value store with per-entry TTL and least-recently-used eviction
/// at capacity. Not internally synchronized; callers that share an
/// instance across tasks must guard it with a mutex.
#[derive(Debug)]
pub struct TtlLruCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    capacity: usize,
    total_hits: u64,
    total_misses: u64,
}

impl<V: Clone> TtlLruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            total_hits: 0,
            total_misses: 0,
        }
    }

    /// Inserts or overwrites `key`, evicting the least-recently-accessed
    /// entry first when the store is at capacity.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, Utc::now());
    }

    fn set_at(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: DateTime<Utc>) {
        let key = key.into();
        let ttl = if ttl <= Duration::zero() {
            // expires_at must stay strictly after created_at
            Duration::milliseconds(1)
        } else {
            ttl
        };

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl,
                hit_count: 0,
                last_accessed_at: now,
            },
        );
    }

    /// Exact-key lookup. Expired entries are removed and counted as a
    /// miss; valid hits refresh the LRU bookkeeping.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let value = self.fetch_at(key, now);
        if value.is_some() {
            self.total_hits += 1;
        } else {
            self.total_misses += 1;
        }
        value
    }

    /// Secondary lookup after a counted miss on the primary key. A hit
    /// here reclassifies the logical lookup from miss to hit, so the
    /// two-step read counts once in the stats.
    pub fn get_fallback(&mut self, key: &str) -> Option<V> {
        let value = self.fetch_at(key, Utc::now());
        if value.is_some() {
            self.total_misses = self.total_misses.saturating_sub(1);
            self.total_hits += 1;
        }
        value
    }

    /// Expiry check and LRU refresh without touching the hit/miss
    /// counters.
    fn fetch_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => now > entry.expires_at,
            None => return None,
        };

        if expired {
            self.entries.remove(key);
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.hit_count += 1;
        entry.last_accessed_at = now;
        Some(entry.value.clone())
    }

    /// Removes all expired entries and returns how many were dropped.
    /// Advisory only; `get` already self-heals on expired reads.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Utc::now())
    }

    fn cleanup_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live keys in unspecified order, for secondary (fuzzy) lookup.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.total_hits + self.total_misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.total_hits as f64 / lookups as f64
        };

        CacheStats {
            total_entries: self.entries.len(),
            capacity: self.capacity,
            total_hits: self.total_hits,
            total_misses: self.total_misses,
            hit_rate,
            oldest_entry_at: self.entries.values().map(|e| e.created_at).min(),
            newest_entry_at: self.entries.values().map(|e| e.created_at).max(),
        }
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}
