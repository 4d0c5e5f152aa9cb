//! Comparison of a play session against reference data.
//!
//! - [`ComparisonEngine`] - Past, benchmark, and stage comparisons with caching
//!   and de-duplication of identical in-flight requests
//! - [`StageComparison`] - Per-stage statistics, pairwise stage comparisons, and
//!   stage rankings for one player
//! - [`Storage`] - Read access to stored sessions, with [`MemoryStorage`] as an
//!   in-process implementation
//! - [`ResultCache`] - Bounded LRU of finished results with a lifetime per entry
//! - [`ImprovementSuggestionGenerator`] - Rule table turning a result into
//!   [`Suggestion`] codes
//!
//! # Example
//!
//! ```
//! use futures::executor::block_on;
//! use popstat_compare::{ComparisonConfig, ComparisonEngine, MemoryStorage, PastParams};
//! use popstat_metrics::SessionRecord;
//!
//! let session = |id: &str, start_time: i64, popped: u64| SessionRecord {
//!     session_id: id.to_owned(),
//!     player_id: Some("p1".to_owned()),
//!     stage_id: None,
//!     start_time,
//!     end_time: start_time + 60_000,
//!     final_score: 1000,
//!     bubbles_popped: popped,
//!     bubbles_missed: 100 - popped,
//!     max_combo: 10,
//!     completed: true,
//! };
//!
//! let storage = MemoryStorage::with_records(
//!     "sessions",
//!     vec![session("a", 0, 60), session("b", 100_000, 80)],
//! );
//! let engine = ComparisonEngine::new(storage, ComparisonConfig::default());
//!
//! let result = block_on(engine.compare_past(&session("c", 200_000, 90), PastParams::default()))
//!     .unwrap();
//! assert_eq!(result.sample_size, 2);
//! assert!((result.baseline_metrics.unwrap().accuracy - 0.7).abs() < 1e-9);
//! ```

use popstat_metrics::InvalidRecordError;

pub use self::{
    cache::*, config::*, engine::*, fingerprint::*, result::*, stage::*, storage::*,
    suggestion::*,
};

mod cache;
mod config;
mod engine;
mod fingerprint;
mod result;
mod stage;
mod storage;
mod suggestion;

/// Failure of a comparison request.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CompareError {
    #[display("invalid record: {_0}")]
    InvalidRecord(InvalidRecordError),
    #[display("data unavailable: {_0}")]
    DataUnavailable(StorageError),
    #[display("at least 2 stages required, found {found}")]
    #[from(skip)]
    InsufficientStages { found: usize },
}
