use std::{num::NonZeroUsize, time::Duration};

use serde::{Deserialize, Serialize};

const DEFAULT_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(99);

/// Tunables of the [`ComparisonEngine`](crate::ComparisonEngine).
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub cache_capacity: NonZeroUsize,
    pub cache_ttl_secs: u64,
    pub default_window_size: usize,
    pub max_window_size: usize,
    pub default_recency_days: u32,
    /// Fewer usable baseline sessions than this yields an insufficient-data result.
    pub min_baseline_sessions: usize,
    /// Relative changes with a smaller magnitude count as stable.
    pub stable_threshold: f64,
    pub store_name: String,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: 300,
            default_window_size: 10,
            max_window_size: 100,
            default_recency_days: 90,
            min_baseline_sessions: 2,
            stable_threshold: 0.05,
            store_name: "sessions".to_owned(),
        }
    }
}

impl ComparisonConfig {
    /// Lifetime of a cached result.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Resolves a requested window: unset or zero means the default, and the
    /// result never exceeds `max_window_size`.
    #[must_use]
    pub fn window_size(&self, requested: Option<usize>) -> usize {
        let size = match requested {
            None | Some(0) => self.default_window_size,
            Some(n) => n,
        };
        size.clamp(1, self.max_window_size.max(1))
    }

    /// Resolves a benchmark recency window: unset or zero means the default.
    #[must_use]
    pub fn recency_days(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_recency_days,
            Some(n) => n,
        }
    }
}
