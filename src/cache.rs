//! Read-through ACL cache keyed by object identity.
//!
//! Entries are bounded by count (SIEVE eviction) and optionally by age since write and
//! age since last read. Every mutation path in the engine evicts the affected identity
//! before returning, so a cached ACL is never older than the last committed change.
//!
//! A read-through fill races with writers: the loaded ACL may already be stale when it
//! reaches the cache. Evictions bump a generation under the cache lock, and a fill is
//! dropped when the generation moved since the caller observed it before loading.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sieve_cache::SieveCache;

use crate::types::{Acl, CacheConfig, ObjectIdentity};
use crate::{AclError, Result};

#[derive(Debug, Clone)]
struct CachedAcl {
    acl: Acl,
    inserted: Instant,
    last_access: Instant,
}

impl CachedAcl {
    fn expired(&self, now: Instant, ttl: Option<Duration>, tti: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.inserted) >= ttl)
            || tti.is_some_and(|tti| now.duration_since(self.last_access) >= tti)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Explicit evictions and expirations; capacity evictions are not counted.
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

pub struct AclCache {
    /// `None` when the configured capacity is zero.
    entries: Option<Mutex<SieveCache<ObjectIdentity, CachedAcl>>>,
    capacity: usize,
    time_to_live: Option<Duration>,
    time_to_idle: Option<Duration>,
    /// Bumped under the entries lock by every eviction and clear.
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for AclCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclCache")
            .field("capacity", &self.capacity)
            .field("time_to_live", &self.time_to_live)
            .field("time_to_idle", &self.time_to_idle)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl AclCache {
    /// A capacity of zero yields a cache that stores nothing.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let entries = if config.capacity == 0 {
            None
        } else {
            let cache = SieveCache::new(config.capacity).map_err(|error| {
                AclError::invalid(format!("could not initialize acl cache: {error}"))
            })?;
            Some(Mutex::new(cache))
        };
        Ok(Self {
            entries,
            capacity: config.capacity,
            time_to_live: config.time_to_live(),
            time_to_idle: config.time_to_idle(),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn get(&self, identity: &ObjectIdentity) -> Option<Acl> {
        let Some(entries) = &self.entries else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        let now = Instant::now();
        let mut cache = entries.lock();
        let expired = match cache.get_mut(identity) {
            Some(cached) if !cached.expired(now, self.time_to_live, self.time_to_idle) => {
                cached.last_access = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(cached.acl.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.remove(identity);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache.identity = %identity, "expired cached acl");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, acl: &Acl) {
        let Some(entries) = &self.entries else {
            return;
        };
        insert(&mut entries.lock(), acl);
    }

    /// Observe before loading an ACL that will be passed to [`Self::put_if_current`].
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Cache `acl` unless an eviction or clear happened since `observed` was read.
    /// Returns whether the entry was stored.
    pub fn put_if_current(&self, acl: &Acl, observed: u64) -> bool {
        let Some(entries) = &self.entries else {
            return false;
        };
        let mut cache = entries.lock();
        if self.generation.load(Ordering::Acquire) != observed {
            return false;
        }
        insert(&mut cache, acl);
        true
    }

    /// Drop one identity. Returns whether an entry was present.
    ///
    /// Invalidates in-flight fills even when nothing was cached.
    pub fn evict(&self, identity: &ObjectIdentity) -> bool {
        let Some(entries) = &self.entries else {
            return false;
        };
        let mut cache = entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let removed = cache.remove(identity).is_some();
        drop(cache);
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache.identity = %identity, "evicted cached acl");
        }
        removed
    }

    pub fn clear(&self) {
        let Some(entries) = &self.entries else {
            return;
        };
        let mut cache = entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let dropped = cache.len() as u64;
        // Capacity was accepted at construction, so rebuilding cannot fail.
        if let Ok(fresh) = SieveCache::new(self.capacity) {
            *cache = fresh;
            self.evictions.fetch_add(dropped, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}

fn insert(cache: &mut SieveCache<ObjectIdentity, CachedAcl>, acl: &Acl) {
    let now = Instant::now();
    cache.insert(
        acl.identity.clone(),
        CachedAcl {
            acl: acl.clone(),
            inserted: now,
            last_access: now,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn acl(id: i64) -> Acl {
        Acl::new(ObjectIdentity::new("Folder", id))
    }

    fn config(capacity: usize, ttl_ms: Option<u64>, tti_ms: Option<u64>) -> CacheConfig {
        CacheConfig {
            capacity,
            time_to_live_ms: ttl_ms,
            time_to_idle_ms: tti_ms,
        }
    }

    #[test]
    fn put_get_evict() {
        let cache = AclCache::new(&config(4, None, None)).expect("cache");
        let folder = acl(1);
        assert!(cache.get(&folder.identity).is_none());
        cache.put(&folder);
        assert_eq!(cache.get(&folder.identity), Some(folder.clone()));
        assert!(cache.evict(&folder.identity));
        assert!(!cache.evict(&folder.identity));
        assert!(cache.get(&folder.identity).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn capacity_bounds_entry_count() {
        let cache = AclCache::new(&config(2, None, None)).expect("cache");
        for id in 0..5 {
            cache.put(&acl(id));
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = AclCache::new(&config(0, None, None)).expect("cache");
        cache.put(&acl(1));
        assert!(cache.is_empty());
        assert!(cache.get(&acl(1).identity).is_none());
    }

    #[test]
    fn entries_expire_after_time_to_live() {
        let cache = AclCache::new(&config(8, Some(20), None)).expect("cache");
        cache.put(&acl(1));
        assert!(cache.get(&acl(1).identity).is_some());
        thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&acl(1).identity).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn fill_after_eviction_is_discarded() {
        let cache = AclCache::new(&config(8, None, None)).expect("cache");
        let stale = acl(1);
        let observed = cache.generation();
        // A writer commits and evicts while the reader is still loading.
        assert!(!cache.evict(&stale.identity));
        assert!(!cache.put_if_current(&stale, observed));
        assert!(cache.get(&stale.identity).is_none());

        let observed = cache.generation();
        assert!(cache.put_if_current(&stale, observed));
        assert!(cache.get(&stale.identity).is_some());

        let observed = cache.generation();
        cache.clear();
        assert!(!cache.put_if_current(&acl(2), observed));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = AclCache::new(&config(8, None, None)).expect("cache");
        cache.put(&acl(1));
        cache.put(&acl(2));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 2);
    }
}
