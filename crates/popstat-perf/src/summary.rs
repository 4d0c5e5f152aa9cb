use std::collections::BTreeMap;

use popstat_stats::descriptive::{DescriptiveStats, round_to};
use serde::{Deserialize, Serialize};

use crate::{ErrorSample, FpsSample, LoadTimeSample, MemorySample, Recorded};

/// Summary of one numeric series. All fields are zero for an empty series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    /// Most recently recorded value.
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub data_points: usize,
}

impl StatisticsSummary {
    /// Summarizes `values` in recording order, rounding the average to
    /// `decimals` places.
    pub fn from_values<I>(values: I, decimals: u8) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let Some(current) = values.last().copied() else {
            return Self::default();
        };
        let Some(stats) = DescriptiveStats::new(values.iter().copied()) else {
            return Self::default();
        };
        Self {
            current,
            average: round_to(stats.mean, decimals),
            min: stats.min,
            max: stats.max,
            data_points: stats.count,
        }
    }
}

/// Frame-rate statistics over the buffered FPS samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsStatistics {
    #[serde(flatten)]
    pub summary: StatisticsSummary,
    /// Samples at or below the low-FPS threshold.
    pub below_threshold: usize,
    pub average_frame_time: f64,
}

/// Heap usage statistics over the buffered memory samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatistics {
    /// Over `usage_percent`.
    #[serde(flatten)]
    pub summary: StatisticsSummary,
    /// Samples above the high-usage threshold.
    pub peak_usage: usize,
    /// Samples below the low-usage threshold.
    pub low_usage: usize,
    pub peak_used_bytes: u64,
}

/// Page-load timing statistics, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTimeStatistics {
    /// Over `load_complete`.
    #[serde(flatten)]
    pub summary: StatisticsSummary,
    pub average_dom_content_loaded: f64,
    /// Loads slower than the slow-load threshold.
    pub slow_loads: usize,
}

/// Error counts by type, with the most recent error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStatistics {
    /// Every error recorded since the last clear, including evicted ones.
    pub total: u64,
    pub data_points: usize,
    pub by_type: BTreeMap<String, usize>,
    pub latest: Option<Recorded<ErrorSample>>,
}

/// Statistics of every sample class, as exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStatistics {
    pub fps: FpsStatistics,
    pub memory: MemoryStatistics,
    pub load_time: LoadTimeStatistics,
    pub errors: ErrorStatistics,
}

/// Latest sample of each class plus the live error count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    pub session_id: String,
    pub fps: Option<FpsSample>,
    pub memory: Option<MemorySample>,
    pub load_time: Option<LoadTimeSample>,
    pub error_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_fps_series() {
        let summary = StatisticsSummary::from_values([30.0, 45.0, 60.0, 55.0, 50.0], 2);
        assert_eq!(summary.current, 50.0);
        assert_eq!(summary.average, 48.0);
        assert_eq!(summary.min, 30.0);
        assert_eq!(summary.max, 60.0);
        assert_eq!(summary.data_points, 5);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        assert_eq!(
            StatisticsSummary::from_values([], 2),
            StatisticsSummary::default()
        );
    }

    #[test]
    fn test_average_is_rounded() {
        let summary = StatisticsSummary::from_values([1.0, 2.0, 2.0], 2);
        assert_eq!(summary.average, 1.67);
    }

    #[test]
    fn test_flattened_json() {
        let stats = FpsStatistics {
            summary: StatisticsSummary::from_values([30.0], 2),
            below_threshold: 1,
            average_frame_time: 33.33,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["current"], 30.0);
        assert_eq!(json["dataPoints"], 1);
        assert_eq!(json["belowThreshold"], 1);
    }
}
