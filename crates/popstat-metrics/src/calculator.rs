use crate::{InvalidRecordError, MetricSet, SessionRecord};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Derives a [`MetricSet`] from a [`SessionRecord`].
///
/// Zero denominators never produce `NaN`:
///
/// - no pop attempts → `accuracy = 1.0`
/// - no bubbles popped → `combo_efficiency = 0.0`
/// - zero-length session → `score_per_minute = 0.0`
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    #[expect(clippy::cast_precision_loss)]
    pub fn calculate(record: &SessionRecord) -> Result<MetricSet, InvalidRecordError> {
        record.validate()?;

        let attempts = record.attempts();
        let accuracy = if attempts == 0 {
            1.0
        } else {
            record.bubbles_popped as f64 / attempts as f64
        };

        let combo_efficiency = if record.bubbles_popped == 0 {
            0.0
        } else {
            record.max_combo as f64 / record.bubbles_popped as f64
        };

        let minutes = record.duration_millis() as f64 / MILLIS_PER_MINUTE;
        let score_per_minute = if minutes > 0.0 {
            record.final_score as f64 / minutes
        } else {
            0.0
        };

        Ok(MetricSet {
            accuracy,
            combo_efficiency,
            score_per_minute,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(popped: u64, missed: u64, max_combo: u64, duration: i64) -> SessionRecord {
        SessionRecord {
            session_id: "s1".to_owned(),
            player_id: Some("p1".to_owned()),
            stage_id: None,
            start_time: 10_000,
            end_time: 10_000 + duration,
            final_score: 1500,
            bubbles_popped: popped,
            bubbles_missed: missed,
            max_combo,
            completed: true,
        }
    }

    #[test]
    fn test_basic_metrics() {
        let metrics = MetricsCalculator::calculate(&record(90, 10, 18, 300_000)).unwrap();
        assert_eq!(metrics.accuracy, 0.9);
        assert_eq!(metrics.combo_efficiency, 0.2);
        assert_eq!(metrics.score_per_minute, 300.0);
    }

    #[test]
    fn test_no_attempts_is_perfect_accuracy() {
        let metrics = MetricsCalculator::calculate(&record(0, 0, 0, 60_000)).unwrap();
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.combo_efficiency, 0.0);
    }

    #[test]
    fn test_zero_duration_has_zero_pace() {
        let metrics = MetricsCalculator::calculate(&record(5, 5, 2, 0)).unwrap();
        assert_eq!(metrics.score_per_minute, 0.0);
        assert_eq!(metrics.accuracy, 0.5);
    }

    #[test]
    fn test_accuracy_stays_in_unit_interval() {
        for (popped, missed) in [(0, 7), (7, 0), (1, 1_000_000), (u64::MAX / 2, 3)] {
            let metrics = MetricsCalculator::calculate(&record(popped, missed, 0, 1000)).unwrap();
            assert!((0.0..=1.0).contains(&metrics.accuracy), "{popped}/{missed}");
        }
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let result = MetricsCalculator::calculate(&record(1, 1, 1, -1));
        assert!(matches!(
            result,
            Err(InvalidRecordError::EndBeforeStart { .. })
        ));
    }
}
