//! Session records and the metrics derived from them.
//!
//! - [`SessionRecord`] - One finished play session as stored by the collector
//! - [`MetricSet`] - Accuracy, score pace, and combo efficiency of a session
//! - [`MetricsCalculator`] - Validates a record and derives its [`MetricSet`]
//! - [`PerMetric`] - One value per [`Metric`], used for deltas, ranks, and trends
//!
//! # Example
//!
//! ```
//! use popstat_metrics::{MetricsCalculator, SessionRecord};
//!
//! let record = SessionRecord {
//!     session_id: "s1".to_owned(),
//!     player_id: Some("p1".to_owned()),
//!     stage_id: None,
//!     start_time: 0,
//!     end_time: 120_000,
//!     final_score: 2400,
//!     bubbles_popped: 80,
//!     bubbles_missed: 20,
//!     max_combo: 16,
//!     completed: true,
//! };
//!
//! let metrics = MetricsCalculator::calculate(&record).unwrap();
//! assert_eq!(metrics.accuracy, 0.8);
//! assert_eq!(metrics.score_per_minute, 1200.0);
//! assert_eq!(metrics.combo_efficiency, 0.2);
//! ```

pub use self::{calculator::*, metric::*, record::*};

mod calculator;
mod metric;
mod record;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidRecordError {
    #[display("session record has an empty session id")]
    EmptySessionId,
    #[display("session {session_id} ends at {end_time} before it starts at {start_time}")]
    EndBeforeStart {
        session_id: String,
        start_time: i64,
        end_time: i64,
    },
    #[display("session {session_id} has no player id")]
    MissingPlayerId { session_id: String },
}
