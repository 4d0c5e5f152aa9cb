/// Summary of a sample of `f64` values. Variance and standard deviation are
/// the population (not sample) measures.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Middle value, or the midpoint of the two middle values.
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Summarizes `values` in any order. Returns `None` for an empty input.
    ///
    /// ```
    /// # use popstat_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
    /// assert_eq!(stats.median, 30.0);
    /// assert!((stats.std_dev - 14.142).abs() < 1e-3);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted = values.into_iter().collect::<Vec<_>>();
        sorted.sort_unstable_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    /// Like [`new`](Self::new) for input already in ascending order.
    ///
    /// Unsorted input trips a debug assertion.
    #[must_use]
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        debug_assert!(
            sorted.windows(2).all(|w| w[0] <= w[1]),
            "input is not in ascending order"
        );
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let mean = mean(sorted)?;
        let half = sorted.len() / 2;
        let median = if sorted.len() % 2 == 1 {
            sorted[half]
        } else {
            f64::midpoint(sorted[half - 1], sorted[half])
        };
        let squares = sorted.iter().map(|v| (v - mean) * (v - mean)).collect::<Vec<_>>();
        let variance = mean_of(&squares);
        Some(Self {
            count: sorted.len(),
            min,
            max,
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
        })
    }
}

/// Arithmetic mean of `values`, or `None` when empty.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| mean_of(values))
}

#[expect(clippy::cast_precision_loss)]
fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Most fractional digits [`round_to`] honors; an `f64` carries no more.
pub const MAX_ROUNDING_DECIMALS: u8 = 15;

/// Rounds `value` to `decimals` fractional digits, capped at
/// [`MAX_ROUNDING_DECIMALS`].
///
/// ```
/// # use popstat_stats::descriptive::round_to;
/// assert_eq!(round_to(48.123_456, 2), 48.12);
/// assert_eq!(round_to(47.5, 0), 48.0);
/// ```
#[must_use]
pub fn round_to(value: f64, decimals: u8) -> f64 {
    let factor = 10_f64.powi(i32::from(decimals.min(MAX_ROUNDING_DECIMALS)));
    (value * factor).round() / factor
}
