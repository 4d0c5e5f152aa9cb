use serde::{Deserialize, Serialize};

/// Lower quartile, median, and upper quartile of a dataset.
///
/// # Examples
///
/// ```
/// use popstat_stats::percentiles::Quartiles;
///
/// let quartiles = Quartiles::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert_eq!(quartiles.p25, 2.0);
/// assert_eq!(quartiles.p50, 3.0);
/// assert_eq!(quartiles.p75, 4.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl Quartiles {
    /// Computes quartiles from unsorted values. Returns `None` for an empty dataset.
    #[must_use]
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            p25: compute_percentile(&sorted, 25.0),
            p50: compute_percentile(&sorted, 50.0),
            p75: compute_percentile(&sorted, 75.0),
        })
    }
}

/// Computes a single percentile value from sorted data.
///
/// Uses linear interpolation between the two closest ranks: the `p`-th
/// percentile sits at fractional index `(n - 1) * p / 100`.
///
/// Returns `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use popstat_stats::percentiles::compute_percentile;
///
/// let values = [10.0, 20.0, 30.0, 40.0];
/// assert_eq!(compute_percentile(&values, 50.0), 25.0);
/// assert_eq!(compute_percentile(&values, 100.0), 40.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    debug_assert!(
        sorted_values.is_sorted_by(|a, b| a <= b),
        "values must be sorted in ascending order"
    );
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let position = (sorted_values.len() - 1) as f64 * percentile.clamp(0.0, 100.0) / 100.0;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted_values[lower];
    }
    let weight = position - lower as f64;
    sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
}

/// Percentile rank of `value` within `population`, in `0.0..=100.0`.
///
/// The rank is the fraction of the population strictly below `value`, with
/// every tie counted as half below. Returns `None` for an empty population.
///
/// # Examples
///
/// ```
/// use popstat_stats::percentiles::percentile_rank;
///
/// let population = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(percentile_rank(&population, 5.0), Some(100.0));
/// assert_eq!(percentile_rank(&population, 0.0), Some(0.0));
/// assert_eq!(percentile_rank(&population, 2.0), Some(37.5));
/// assert_eq!(percentile_rank(&[], 2.0), None);
/// ```
#[expect(clippy::cast_precision_loss)]
#[allow(clippy::float_cmp)]
#[must_use]
pub fn percentile_rank(population: &[f64], value: f64) -> Option<f64> {
    if population.is_empty() {
        return None;
    }
    let (below, ties) = population
        .iter()
        .fold((0_usize, 0_usize), |(below, ties), &v| {
            if v < value {
                (below + 1, ties)
            } else if v == value {
                (below, ties + 1)
            } else {
                (below, ties)
            }
        });
    let rank = (below as f64 + ties as f64 / 2.0) / population.len() as f64;
    Some(rank * 100.0)
}
