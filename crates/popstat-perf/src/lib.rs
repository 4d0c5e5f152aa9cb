//! Streaming performance statistics for a running game client.
//!
//! - [`StatisticsAggregator`] - Bounded ring buffers of FPS, memory, load-time
//!   and error samples, threshold alerts, timed measurements, and export
//! - [`AlertDispatcher`] - Callback and channel subscribers for [`AlertEvent`]s
//! - [`PerformanceMonitor`] - Interval timers feeding a [`PerformanceProbe`]
//!   into an aggregator
//! - [`ExportDocument`] - JSON or CSV rendering of statistics and raw samples

pub use self::{
    aggregator::*, alert::*, config::*, export::*, measure::Measurement, monitor::*, sample::*,
    summary::*,
};

mod aggregator;
mod alert;
mod config;
mod export;
mod measure;
mod monitor;
mod ring_buffer;
mod sample;
mod summary;
