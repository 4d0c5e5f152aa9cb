use std::{
    num::NonZeroUsize,
    rc::Rc,
    time::{Duration, Instant},
};

use lru::LruCache;
use tracing::debug;

use crate::{ComparisonResult, Fingerprint};

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Rc<ComparisonResult>,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Counters of a [`ResultCache`] since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Live entries pushed out by capacity.
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or zero before the first lookup.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU cache of finished comparisons with a per-entry lifetime.
///
/// Expired entries count as absent and are dropped lazily on lookup.
#[derive(Debug)]
pub struct ResultCache {
    entries: LruCache<Fingerprint, CacheEntry>,
    ttl: Duration,
    stats: CacheStats,
}

impl ResultCache {
    /// Creates a cache holding at most `capacity` results, each for `ttl`.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        debug!(capacity = capacity.get(), ?ttl, "created comparison cache");
        Self {
            entries: LruCache::new(capacity),
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Returns the live entry for `fingerprint`, marking it most recently used.
    pub fn get(&mut self, fingerprint: &Fingerprint) -> Option<Rc<ComparisonResult>> {
        let now = Instant::now();
        match self.entries.get(fingerprint) {
            None => {
                self.stats.misses += 1;
                return None;
            }
            Some(entry) if !entry.is_expired(self.ttl, now) => {
                self.stats.hits += 1;
                return Some(Rc::clone(&entry.result));
            }
            Some(_) => {}
        }
        self.entries.pop(fingerprint);
        self.stats.expirations += 1;
        self.stats.misses += 1;
        debug!(%fingerprint, "comparison cache entry expired");
        None
    }

    /// Stores `result`, evicting the least recently used entry when full.
    pub fn insert(&mut self, fingerprint: Fingerprint, result: Rc<ComparisonResult>) {
        let entry = CacheEntry {
            result,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.entries.push(fingerprint.clone(), entry)
            && evicted != fingerprint
        {
            self.stats.evictions += 1;
            debug!(%evicted, "evicted comparison from cache");
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl, now))
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect::<Vec<_>>();
        for fingerprint in &expired {
            self.entries.pop(fingerprint);
        }
        self.stats.expirations += expired.len() as u64;
        expired.len()
    }

    /// Whether a live entry exists, without touching recency or counters.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries
            .peek(fingerprint)
            .is_some_and(|entry| !entry.is_expired(self.ttl, Instant::now()))
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use popstat_metrics::MetricSet;

    use super::*;
    use crate::{ComparisonKind, ComparisonParams};

    fn fingerprint(target: &str) -> Fingerprint {
        Fingerprint::new(target, ComparisonParams::Past { window_size: 10 })
    }

    fn result(target: &str) -> Rc<ComparisonResult> {
        Rc::new(ComparisonResult::insufficient(
            ComparisonKind::Past,
            target.to_owned(),
            MetricSet::default(),
            0,
            0,
        ))
    }

    fn cache(capacity: usize, ttl: Duration) -> ResultCache {
        ResultCache::new(NonZeroUsize::new(capacity).unwrap(), ttl)
    }

    #[test]
    fn test_hit_returns_same_instance() {
        let mut cache = cache(4, Duration::from_secs(60));
        let stored = result("s1");
        cache.insert(fingerprint("s1"), Rc::clone(&stored));

        let hit = cache.get(&fingerprint("s1")).unwrap();
        assert!(Rc::ptr_eq(&hit, &stored));
        assert!(cache.get(&fingerprint("s2")).is_none());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0,
                expirations: 0,
            }
        );
    }

    #[test]
    fn test_zero_ttl_is_always_expired() {
        let mut cache = cache(4, Duration::ZERO);
        cache.insert(fingerprint("s1"), result("s1"));
        assert!(!cache.contains(&fingerprint("s1")));
        assert!(cache.get(&fingerprint("s1")).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = cache(2, Duration::from_secs(60));
        cache.insert(fingerprint("a"), result("a"));
        cache.insert(fingerprint("b"), result("b"));
        // touch "a" so "b" becomes the eviction candidate
        assert!(cache.get(&fingerprint("a")).is_some());
        cache.insert(fingerprint("c"), result("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&fingerprint("a")));
        assert!(!cache.contains(&fingerprint("b")));
        assert!(cache.contains(&fingerprint("c")));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replacing_a_key_is_not_an_eviction() {
        let mut cache = cache(1, Duration::from_secs(60));
        cache.insert(fingerprint("a"), result("a"));
        cache.insert(fingerprint("a"), result("a"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = cache(4, Duration::ZERO);
        cache.insert(fingerprint("a"), result("a"));
        cache.insert(fingerprint("b"), result("b"));
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }
}
