//! Statistical building blocks for gameplay telemetry.
//!
//! This crate provides the numeric primitives shared by the comparison engine
//! and the performance statistics aggregator:
//!
//! - **Descriptive statistics**: min, max, mean, median, variance, standard deviation
//! - **Percentiles**: interpolated quantiles and percentile ranks with tie handling
//! - **Linear trend**: least-squares slope and correlation over a series
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Quantile computation and percentile ranking
//! - [`trend`]: Linear trend estimation over ordered samples
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use popstat_stats::descriptive::DescriptiveStats;
//!
//! let values = [30.0, 45.0, 60.0, 55.0, 50.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 48.0);
//! assert_eq!(stats.min, 30.0);
//! assert_eq!(stats.max, 60.0);
//! ```
//!
//! ## Ranking a value against a population
//!
//! ```
//! use popstat_stats::percentiles::percentile_rank;
//!
//! let population = [10.0, 20.0, 30.0, 40.0];
//! // Two values strictly below, one tie counted as half
//! assert_eq!(percentile_rank(&population, 30.0), Some(62.5));
//! ```
//!
//! ## Estimating a trend
//!
//! ```
//! use popstat_stats::trend::LinearTrend;
//!
//! let trend = LinearTrend::from_values(&[10.0, 20.0, 30.0, 40.0, 50.0]);
//! assert_eq!(trend.slope, 10.0);
//! ```

pub mod descriptive;
pub mod percentiles;
pub mod trend;
