use serde::{Deserialize, Serialize};

/// Thresholds, buffer sizes and sampling intervals of the performance layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Capacity of every sample ring buffer.
    pub max_data_points: usize,
    /// Frame rates at or below this raise a warning; at or below half of it, an error.
    pub low_fps_threshold: f64,
    /// Memory usage percentages above this raise a warning.
    pub high_memory_threshold: f64,
    /// Memory usage percentages at or above this raise an error.
    pub critical_memory_threshold: f64,
    pub low_memory_threshold: f64,
    pub slow_load_threshold_ms: f64,
    /// Decimal places kept in averages.
    pub average_decimals: u8,
    pub fps_interval_ms: u64,
    pub memory_interval_ms: u64,
    pub memory_monitoring: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_data_points: 1000,
            low_fps_threshold: 30.0,
            high_memory_threshold: 80.0,
            critical_memory_threshold: 95.0,
            low_memory_threshold: 50.0,
            slow_load_threshold_ms: 5000.0,
            average_decimals: 2,
            fps_interval_ms: 1000,
            memory_interval_ms: 5000,
            memory_monitoring: true,
        }
    }
}
