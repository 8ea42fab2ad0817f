//! Keyed store of encoded results.
//!
//! The [`ResultCache`] maps an opaque cache name to the encoded bytes produced
//! for it. It has no TTL and no entry limit; it shrinks only when memory
//! pressure is signalled (or when an optional soft byte limit is crossed).
//! Victims are chosen least-recently-used first.
//!
//! Two threads that miss on the same key will both compute and both store.
//! The later store wins. Results for a key are deterministic, so this only
//! costs duplicated work.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::pressure::{MemoryPressure, PressureLevel, PressureListener, Subscription};

/// Default share of resident bytes released on moderate pressure.
pub const DEFAULT_COMPACTION_RATIO: f64 = 0.25;

/// Tuning for a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheOptions {
    /// Share of resident bytes released on moderate pressure, in `(0, 1]`.
    pub compaction_ratio: f64,
    /// Soft cap on resident payload bytes.
    pub memory_limit: Option<usize>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            compaction_ratio: DEFAULT_COMPACTION_RATIO,
            memory_limit: None,
        }
    }
}

/// Counters describing cache activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct CacheEntry {
    payload: Arc<[u8]>,
    /// Order in which the entry was (re)stored.
    inserted_at: u64,
    /// Monotonically increasing access counter for LRU eviction.
    last_access: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    resident_bytes: usize,
    access_counter: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.resident_bytes = self.resident_bytes.saturating_sub(entry.payload.len());
        Some(entry)
    }

    /// Evict every entry. Returns `(evicted, released_bytes)`.
    fn evict_all(&mut self) -> (usize, usize) {
        let evicted = self.entries.len();
        let released = self.resident_bytes;
        self.entries.clear();
        self.resident_bytes = 0;
        self.stats.evictions += evicted as u64;
        (evicted, released)
    }

    /// Evict least-recently-used entries until `resident_bytes <= target`.
    ///
    /// Always evicts at least one entry when not empty. `keep` is never evicted.
    fn evict_down_to(&mut self, target: usize, keep: Option<&str>) -> (usize, usize) {
        let mut victims: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != keep)
            .map(|(key, entry)| (entry.last_access, key.clone()))
            .collect();
        victims.sort_unstable();

        let mut evicted = 0;
        let mut released = 0;
        for (_, key) in victims {
            if evicted > 0 && self.resident_bytes <= target {
                break;
            }
            if let Some(entry) = self.remove(&key) {
                evicted += 1;
                released += entry.payload.len();
                log::debug!(
                    "evicted {:?} ({} bytes, stored #{}), resident now {} bytes",
                    key,
                    entry.payload.len(),
                    entry.inserted_at,
                    self.resident_bytes
                );
            }
        }
        self.stats.evictions += evicted as u64;
        (evicted, released)
    }
}

#[derive(Debug)]
struct CacheStore {
    state: Mutex<CacheState>,
    options: CacheOptions,
}

impl CacheStore {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("result cache lock was poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }

    fn relieve(&self, level: PressureLevel) -> usize {
        let mut state = self.lock();
        if state.entries.is_empty() {
            return 0;
        }

        let before = state.resident_bytes;
        let count_before = state.entries.len();
        let (evicted, released) = match level {
            PressureLevel::Critical => state.evict_all(),
            PressureLevel::Moderate => {
                let ratio = self.options.compaction_ratio;
                let release = ((before as f64) * ratio).ceil() as usize;
                state.evict_down_to(before.saturating_sub(release), None)
            }
        };

        log::info!(
            "memory pressure {:?}: evicted {} of {} entries, released {} of {} bytes",
            level,
            evicted,
            count_before,
            released,
            before
        );
        released
    }
}

impl PressureListener for CacheStore {
    fn on_memory_pressure(&self, level: PressureLevel) {
        self.relieve(level);
    }
}

/// Thread-safe, pressure-bounded map from cache name to encoded bytes.
///
/// An empty or absent key always misses and is never stored, which lets a
/// caller opt a single request out of caching.
#[derive(Debug)]
pub struct ResultCache {
    store: Arc<CacheStore>,
    _subscription: Option<Subscription>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl ResultCache {
    /// Create a cache that only shrinks through [`ResultCache::relieve`] or its soft limit.
    pub fn new(options: CacheOptions) -> Self {
        let options = CacheOptions {
            compaction_ratio: normalize_ratio(options.compaction_ratio),
            ..options
        };
        Self {
            store: Arc::new(CacheStore {
                state: Mutex::new(CacheState::default()),
                options,
            }),
            _subscription: None,
        }
    }

    /// Create a cache that compacts itself whenever `pressure` is signalled.
    ///
    /// The subscription ends when the cache is dropped.
    pub fn subscribed(pressure: &MemoryPressure, options: CacheOptions) -> Self {
        let mut cache = Self::new(options);
        let listener: Arc<dyn PressureListener> = cache.store.clone();
        cache._subscription = Some(pressure.subscribe(listener));
        cache
    }

    /// Return a copy of the payload stored for `key`.
    pub fn lookup(&self, key: Option<&str>) -> Option<Vec<u8>> {
        let key = usable_key(key)?;
        let payload = {
            let mut state = self.store.lock();
            let counter = state.tick();
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.last_access = counter;
                    let payload = Arc::clone(&entry.payload);
                    state.stats.hits += 1;
                    payload
                }
                None => {
                    state.stats.misses += 1;
                    log::debug!("cache miss for {:?}", key);
                    return None;
                }
            }
        };
        log::debug!("cache hit for {:?} ({} bytes)", key, payload.len());
        Some(payload.to_vec())
    }

    /// Insert or overwrite the payload for `key`. Last writer wins.
    pub fn store(&self, key: Option<&str>, payload: Vec<u8>) {
        let Some(key) = usable_key(key) else {
            return;
        };

        let size = payload.len();
        let mut state = self.store.lock();
        state.remove(key);

        let counter = state.tick();
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                payload: payload.into(),
                inserted_at: counter,
                last_access: counter,
            },
        );
        state.resident_bytes += size;
        state.stats.stores += 1;
        log::debug!(
            "stored {:?} ({} bytes), resident now {} bytes",
            key,
            size,
            state.resident_bytes
        );

        if let Some(limit) = self.store.options.memory_limit {
            if state.resident_bytes > limit {
                let (evicted, released) = state.evict_down_to(limit, Some(key));
                log::info!(
                    "soft limit {} bytes exceeded: evicted {} entries ({} bytes)",
                    limit,
                    evicted,
                    released
                );
            }
        }
    }

    /// Release memory as if the host had signalled `level`.
    ///
    /// Returns the number of payload bytes released.
    pub fn relieve(&self, level: PressureLevel) -> usize {
        self.store.relieve(level)
    }

    /// Drop one entry. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.store.lock().remove(key).is_some()
    }

    /// Drop every entry. Dropped entries count as evictions.
    pub fn clear(&self) {
        let (evicted, released) = self.store.lock().evict_all();
        if evicted > 0 {
            log::info!("cache cleared: evicted {evicted} entries, released {released} bytes");
        }
    }

    /// Check if `key` is cached without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().entries.contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes currently held.
    pub fn resident_bytes(&self) -> usize {
        self.store.lock().resident_bytes
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats
    }

    pub fn options(&self) -> CacheOptions {
        self.store.options
    }
}

fn usable_key(key: Option<&str>) -> Option<&str> {
    key.filter(|k| !k.is_empty())
}

fn normalize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(1.0)
    } else {
        DEFAULT_COMPACTION_RATIO
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Moderate pressure strictly reduces resident bytes and
        /// evicted keys are never returned afterwards.
        #[test]
        fn prop_moderate_pressure_reduces_resident_bytes(
            sizes in prop::collection::vec(1usize..=512, 1..32),
            ratio in 0.01f64..=1.0,
        ) {
            let cache = ResultCache::new(CacheOptions { compaction_ratio: ratio, memory_limit: None });
            for (i, size) in sizes.iter().enumerate() {
                cache.store(Some(&format!("k{i}")), vec![0u8; *size]);
            }
            let before = cache.resident_bytes();
            let released = cache.relieve(PressureLevel::Moderate);

            prop_assert!(released > 0);
            prop_assert_eq!(cache.resident_bytes(), before - released);
            let target = before - ((before as f64) * ratio).ceil() as usize;
            prop_assert!(cache.resident_bytes() <= target);

            for i in 0..sizes.len() {
                let key = format!("k{i}");
                let present = cache.contains(&key);
                prop_assert_eq!(cache.lookup(Some(&key)).is_some(), present);
            }
        }

        /// Property: Store followed by lookup returns the stored payload.
        #[test]
        fn prop_store_then_lookup(key in "[a-z]{1,12}", bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let cache = ResultCache::default();
            cache.store(Some(&key), bytes.clone());
            prop_assert_eq!(cache.lookup(Some(&key)), Some(bytes));
        }
    }
}
