use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};

/// Default time-to-live for entries stored without an explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// An entry is valid while strictly less than `ttl` has elapsed.
    /// A zero TTL is therefore never valid.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries physically held, including expired ones not yet purged.
    pub entries: usize,
    pub live: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    /// Expired entries dropped by `get` or `purge_expired`.
    pub evictions: u64,
}

/// Key/value store with per-entry expiry, checked at read time.
///
/// There is no background timer: an expired entry stays in memory until
/// `get` touches it or the owner calls `purge_expired`. `has` only looks.
pub struct EphemeralCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V> EphemeralCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
            default_ttl: DEFAULT_TTL,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Override the TTL used by `set`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `value` under `key` with the default TTL, replacing any prior entry.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    /// Store `value` under `key` for `ttl`. `Duration::ZERO` stores an entry
    /// that is already expired.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        trace!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Return the value for `key` if it is present and has not expired.
    ///
    /// An expired entry is removed before `None` is returned.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let now = self.clock.now();
        let valid = match self.entries.get(key) {
            Some(entry) => entry.is_valid_at(now),
            None => {
                self.misses += 1;
                trace!(key = %key, "Cache miss");
                return None;
            }
        };

        if !valid {
            self.entries.remove(key);
            self.misses += 1;
            self.evictions += 1;
            debug!(key = %key, "Cache entry expired, evicted on read");
            return None;
        }

        self.hits += 1;
        trace!(key = %key, "Cache hit");
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// True iff `key` has an unexpired entry. Never evicts.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map(|entry| entry.is_valid_at(now))
            .unwrap_or(false)
    }

    /// Remove one entry when `key` is given, otherwise empty the cache.
    pub fn clear(&mut self, key: Option<&str>) {
        match key {
            Some(key) => self.remove(key),
            None => self.clear_all(),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear_all(&mut self) {
        debug!(entries = self.entries.len(), "Clearing cache");
        self.entries.clear();
    }

    /// Drop every expired entry now and return how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid_at(now));
        let purged = before - self.entries.len();
        if purged > 0 {
            self.evictions += purged as u64;
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let live = self
            .entries
            .values()
            .filter(|entry| entry.is_valid_at(now))
            .count();
        CacheStats {
            entries: self.entries.len(),
            live,
            expired: self.entries.len() - live,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

impl<V> Default for EphemeralCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
