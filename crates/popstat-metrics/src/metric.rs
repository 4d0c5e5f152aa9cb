use serde::{Deserialize, Serialize};

/// A derived per-session metric.
///
/// Variants are declared in priority order: when two findings are equally
/// important, the one about the earlier metric wins.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    #[display("accuracy")]
    Accuracy,
    #[display("comboEfficiency")]
    ComboEfficiency,
    #[display("scorePerMinute")]
    ScorePerMinute,
}

impl Metric {
    /// All metrics, highest priority first.
    pub const ALL: [Self; 3] = [Self::Accuracy, Self::ComboEfficiency, Self::ScorePerMinute];
}

/// One value of type `T` for each [`Metric`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerMetric<T> {
    pub accuracy: T,
    pub combo_efficiency: T,
    pub score_per_minute: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Metric) -> T,
    {
        Self {
            accuracy: f(Metric::Accuracy),
            combo_efficiency: f(Metric::ComboEfficiency),
            score_per_minute: f(Metric::ScorePerMinute),
        }
    }

    #[must_use]
    pub const fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Accuracy => &self.accuracy,
            Metric::ComboEfficiency => &self.combo_efficiency,
            Metric::ScorePerMinute => &self.score_per_minute,
        }
    }

    pub fn map<U, F>(&self, mut f: F) -> PerMetric<U>
    where
        F: FnMut(Metric, &T) -> U,
    {
        PerMetric::from_fn(|metric| f(metric, self.get(metric)))
    }

    /// Iterates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &T)> + '_ {
        Metric::ALL.into_iter().map(|metric| (metric, self.get(metric)))
    }
}

/// Metrics derived from a single session.
///
/// - `accuracy` is in `0.0..=1.0`
/// - `score_per_minute` and `combo_efficiency` are non-negative
pub type MetricSet = PerMetric<f64>;

impl PerMetric<f64> {
    /// Component-wise mean of `sets`, or `None` when `sets` is empty.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(sets: &[Self]) -> Option<Self> {
        if sets.is_empty() {
            return None;
        }
        let n = sets.len() as f64;
        Some(Self::from_fn(|metric| {
            sets.iter().map(|set| *set.get(metric)).sum::<f64>() / n
        }))
    }

    /// Component-wise signed difference `self - baseline`.
    #[must_use]
    pub fn delta(&self, baseline: &Self) -> Self {
        Self::from_fn(|metric| self.get(metric) - baseline.get(metric))
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
    fn test_mean_of_empty_is_none() {
        assert_eq!(MetricSet::mean(&[]), None);
    }

    #[test]
    fn test_mean_and_delta() {
        let mean = MetricSet::mean(&[set(0.8, 0.2, 200.0), set(0.6, 0.4, 100.0)]).unwrap();
        assert!((mean.accuracy - 0.7).abs() < 1e-12);
        assert!((mean.combo_efficiency - 0.3).abs() < 1e-12);
        assert_eq!(mean.score_per_minute, 150.0);

        let delta = set(0.9, 0.1, 150.0).delta(&mean);
        assert!((delta.accuracy - 0.2).abs() < 1e-12);
        assert!((delta.combo_efficiency + 0.2).abs() < 1e-12);
        assert_eq!(delta.score_per_minute, 0.0);
    }

    #[test]
    fn test_iter_is_priority_ordered() {
        let metrics = set(1.0, 2.0, 3.0).iter().map(|(m, _)| m).collect::<Vec<_>>();
        assert_eq!(metrics, Metric::ALL);
        assert!(Metric::Accuracy < Metric::ComboEfficiency);
        assert!(Metric::ComboEfficiency < Metric::ScorePerMinute);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(set(0.5, 0.25, 10.0)).unwrap();
        assert_eq!(json["accuracy"], 0.5);
        assert_eq!(json["comboEfficiency"], 0.25);
        assert_eq!(json["scorePerMinute"], 10.0);
        assert_eq!(Metric::ScorePerMinute.to_string(), "scorePerMinute");
    }
}
