use serde::{Deserialize, Serialize};

/// Least-squares linear trend of a series against its index.
///
/// `slope` is the change per sample; `correlation` is the Pearson correlation
/// between index and value. Both are zero when the trend is undefined (fewer
/// than two samples, or a series with no variance).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub correlation: f64,
}

impl LinearTrend {
    /// Fits a line through `(i, values[i])`.
    ///
    /// # Examples
    ///
    /// ```
    /// use popstat_stats::trend::LinearTrend;
    ///
    /// let falling = LinearTrend::from_values(&[50.0, 40.0, 30.0, 20.0, 10.0]);
    /// assert_eq!(falling.slope, -10.0);
    /// assert!((falling.correlation + 1.0).abs() < 1e-9);
    ///
    /// let flat = LinearTrend::from_values(&[25.0; 5]);
    /// assert_eq!(flat, LinearTrend::default());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        if values.len() < 2 {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n;

        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (i, &y) in values.iter().enumerate() {
            let dx = i as f64 - mean_x;
            let dy = y - mean_y;
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let denominator = (sxx * syy).sqrt();
        let correlation = if denominator == 0.0 {
            0.0
        } else {
            sxy / denominator
        };
        Self {
            slope: if slope == 0.0 { 0.0 } else { slope },
            correlation,
        }
    }
}
