use popstat_metrics::{Metric, MetricSet, PerMetric};
use popstat_stats::{percentiles::Quartiles, trend::LinearTrend};
use serde::{Deserialize, Serialize};

use crate::{ComparisonKind, Suggestion};

/// Direction of a single metric against its baseline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    #[display("improved")]
    Improved,
    #[display("declined")]
    Declined,
    #[display("stable")]
    Stable,
}

impl Trend {
    /// Changes smaller in magnitude than `stable_threshold` are stable.
    #[must_use]
    pub fn classify(relative_change: f64, stable_threshold: f64) -> Self {
        if relative_change.abs() < stable_threshold {
            Self::Stable
        } else if relative_change > 0.0 {
            Self::Improved
        } else {
            Self::Declined
        }
    }
}

/// Summary direction over all metrics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum OverallTrend {
    #[display("improving")]
    Improving,
    #[display("declining")]
    Declining,
    #[display("stable")]
    Stable,
    #[display("insufficientData")]
    InsufficientData,
}

impl OverallTrend {
    /// Majority vote of improved against declined metrics.
    #[must_use]
    pub fn from_trends(trends: &PerMetric<Trend>) -> Self {
        let count = |trend| trends.iter().filter(|(_, t)| **t == trend).count();
        let improved = count(Trend::Improved);
        let declined = count(Trend::Declined);
        match improved.cmp(&declined) {
            std::cmp::Ordering::Greater => Self::Improving,
            std::cmp::Ordering::Less => Self::Declining,
            std::cmp::Ordering::Equal => Self::Stable,
        }
    }
}

/// Reliability of a benchmark population, by number of distinct players.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum DataQuality {
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

impl DataQuality {
    /// Fewer than 3 players is low and fewer than 10 is medium.
    #[must_use]
    pub const fn from_player_count(players: usize) -> Self {
        match players {
            0..3 => Self::Low,
            3..10 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Shape of the population a benchmark comparison ranked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSummary {
    pub total_players: usize,
    pub total_sessions: usize,
    pub quality: DataQuality,
    pub quartiles: PerMetric<Quartiles>,
}

/// Outcome of one comparison.
///
/// Results are shared read-only between every caller that asked for the
/// same fingerprint, so they are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub kind: ComparisonKind,
    pub target_id: String,
    pub target_metrics: MetricSet,
    pub baseline_metrics: Option<MetricSet>,
    pub insufficient_data: bool,
    /// Number of baseline sessions that contributed.
    pub sample_size: usize,
    pub deltas: Option<PerMetric<f64>>,
    pub relative_changes: Option<PerMetric<f64>>,
    pub trends: Option<PerMetric<Trend>>,
    pub overall: OverallTrend,
    /// Improved metrics, highest priority first.
    pub strengths: Vec<Metric>,
    /// Declined metrics, highest priority first.
    pub weaknesses: Vec<Metric>,
    /// Benchmark only: rank of the target within the population, in `0..=100`.
    pub percentile_rank: Option<PerMetric<f64>>,
    /// Past and stage only: per-metric trend over the baseline, oldest first.
    pub history_trend: Option<PerMetric<LinearTrend>>,
    pub benchmark: Option<BenchmarkSummary>,
    pub suggestions: Vec<Suggestion>,
    /// Epoch milliseconds.
    pub computed_at: i64,
}

impl ComparisonResult {
    pub(crate) fn insufficient(
        kind: ComparisonKind,
        target_id: String,
        target_metrics: MetricSet,
        sample_size: usize,
        computed_at: i64,
    ) -> Self {
        Self {
            kind,
            target_id,
            target_metrics,
            baseline_metrics: None,
            insufficient_data: true,
            sample_size,
            deltas: None,
            relative_changes: None,
            trends: None,
            overall: OverallTrend::InsufficientData,
            strengths: vec![],
            weaknesses: vec![],
            percentile_rank: None,
            history_trend: None,
            benchmark: None,
            suggestions: vec![],
            computed_at,
        }
    }

    pub(crate) fn against_baseline(
        kind: ComparisonKind,
        target_id: String,
        target_metrics: MetricSet,
        baseline: MetricSet,
        sample_size: usize,
        stable_threshold: f64,
        computed_at: i64,
    ) -> Self {
        let deltas = target_metrics.delta(&baseline);
        let relative_changes =
            deltas.map(|metric, delta| relative_change(*delta, *baseline.get(metric)));
        let trends = relative_changes.map(|_, rel| Trend::classify(*rel, stable_threshold));
        let with_trend = |trend| {
            trends
                .iter()
                .filter(|(_, t)| **t == trend)
                .map(|(metric, _)| metric)
                .collect::<Vec<_>>()
        };
        Self {
            kind,
            target_id,
            target_metrics,
            baseline_metrics: Some(baseline),
            insufficient_data: false,
            sample_size,
            deltas: Some(deltas),
            relative_changes: Some(relative_changes),
            overall: OverallTrend::from_trends(&trends),
            strengths: with_trend(Trend::Improved),
            weaknesses: with_trend(Trend::Declined),
            trends: Some(trends),
            percentile_rank: None,
            history_trend: None,
            benchmark: None,
            suggestions: vec![],
            computed_at,
        }
    }

    /// Trend of `metric`, or `None` for an insufficient-data result.
    #[must_use]
    pub fn trend(&self, metric: Metric) -> Option<Trend> {
        self.trends.as_ref().map(|t| *t.get(metric))
    }
}

/// `delta / baseline`, saturating to `±1` when the baseline is zero.
pub(crate) fn relative_change(delta: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        if delta == 0.0 { 0.0 } else { delta.signum() }
    } else {
        delta / baseline.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(accuracy: f64, combo_efficiency: f64, score_per_minute: f64) -> MetricSet {
        MetricSet {
            accuracy,
            combo_efficiency,
            score_per_minute,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(Trend::classify(0.049, 0.05), Trend::Stable);
        assert_eq!(Trend::classify(-0.049, 0.05), Trend::Stable);
        assert_eq!(Trend::classify(0.05, 0.05), Trend::Improved);
        assert_eq!(Trend::classify(-0.2, 0.05), Trend::Declined);
    }

    #[test]
    fn test_overall_majority() {
        let trends = PerMetric {
            accuracy: Trend::Improved,
            combo_efficiency: Trend::Improved,
            score_per_minute: Trend::Declined,
        };
        assert_eq!(OverallTrend::from_trends(&trends), OverallTrend::Improving);

        let trends = PerMetric {
            accuracy: Trend::Improved,
            combo_efficiency: Trend::Stable,
            score_per_minute: Trend::Declined,
        };
        assert_eq!(OverallTrend::from_trends(&trends), OverallTrend::Stable);
    }

    #[test]
    fn test_against_baseline() {
        let result = ComparisonResult::against_baseline(
            ComparisonKind::Past,
            "s1".to_owned(),
            set(0.9, 0.1, 300.0),
            set(0.75, 0.2, 300.0),
            4,
            0.05,
            0,
        );
        assert!(!result.insufficient_data);
        let relative = result.relative_changes.unwrap();
        assert!((relative.accuracy - 0.2).abs() < 1e-9);
        assert!((relative.combo_efficiency + 0.5).abs() < 1e-9);
        assert_eq!(relative.score_per_minute, 0.0);
        assert_eq!(result.trend(Metric::Accuracy), Some(Trend::Improved));
        assert_eq!(result.trend(Metric::ComboEfficiency), Some(Trend::Declined));
        assert_eq!(result.trend(Metric::ScorePerMinute), Some(Trend::Stable));
        assert_eq!(result.overall, OverallTrend::Stable);
        assert_eq!(result.strengths, [Metric::Accuracy]);
        assert_eq!(result.weaknesses, [Metric::ComboEfficiency]);
    }

    #[test]
    fn test_strengths_follow_metric_priority() {
        let result = ComparisonResult::against_baseline(
            ComparisonKind::Benchmark,
            "s1".to_owned(),
            set(0.9, 0.3, 400.0),
            set(0.8, 0.2, 300.0),
            5,
            0.05,
            0,
        );
        assert_eq!(
            result.strengths,
            [Metric::Accuracy, Metric::ComboEfficiency, Metric::ScorePerMinute]
        );
        assert!(result.weaknesses.is_empty());
        assert_eq!(result.overall, OverallTrend::Improving);
    }

    #[test]
    fn test_stable_result_has_no_strengths_or_weaknesses() {
        let metrics = set(0.8, 0.2, 300.0);
        let result = ComparisonResult::against_baseline(
            ComparisonKind::Past,
            "s1".to_owned(),
            metrics,
            metrics,
            3,
            0.05,
            0,
        );
        assert!(result.strengths.is_empty());
        assert!(result.weaknesses.is_empty());
        assert_eq!(result.overall, OverallTrend::Stable);
    }

    #[test]
    fn test_zero_baseline_saturates() {
        assert_eq!(relative_change(0.3, 0.0), 1.0);
        assert_eq!(relative_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_data_quality() {
        assert_eq!(DataQuality::from_player_count(0), DataQuality::Low);
        assert_eq!(DataQuality::from_player_count(2), DataQuality::Low);
        assert_eq!(DataQuality::from_player_count(3), DataQuality::Medium);
        assert_eq!(DataQuality::from_player_count(9), DataQuality::Medium);
        assert_eq!(DataQuality::from_player_count(10), DataQuality::High);
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = ComparisonResult::insufficient(
            ComparisonKind::Benchmark,
            "s1".to_owned(),
            set(1.0, 0.0, 0.0),
            0,
            42,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "benchmark");
        assert_eq!(json["insufficientData"], true);
        assert_eq!(json["overall"], "insufficientData");
        assert!(json["baselineMetrics"].is_null());
        assert_eq!(json["strengths"], serde_json::json!([]));
        assert_eq!(json["computedAt"], 42);
    }
}
