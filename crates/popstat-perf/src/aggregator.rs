use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    AlertDispatcher, AlertEvent, AlertKind, AllStatistics, CurrentStats, ErrorSample,
    ErrorStatistics, ExportDocument, ExportError, ExportFormat, FpsSample, FpsStatistics,
    LoadTimeSample, LoadTimeStatistics, Measurement, MemorySample, MemoryStatistics, NoPrivacy,
    PerformanceConfig, PerformanceEvent, Privacy, RawData, Recorded, Severity, StatisticsSummary,
    measure::Measurements, ring_buffer::RingBuffer,
};

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// Bounded streaming statistics over FPS, memory, load-time and error samples.
///
/// Every sample that crosses a threshold emits one alert; consecutive
/// qualifying samples each alert again.
#[derive(Debug)]
pub struct StatisticsAggregator {
    session_id: String,
    config: PerformanceConfig,
    clock: fn() -> i64,
    fps: RingBuffer<Recorded<FpsSample>>,
    memory: RingBuffer<Recorded<MemorySample>>,
    load_times: RingBuffer<Recorded<LoadTimeSample>>,
    errors: RingBuffer<Recorded<ErrorSample>>,
    error_count: u64,
    measurements: Measurements,
    alerts: AlertDispatcher,
}

impl StatisticsAggregator {
    pub fn new<S>(session_id: S, config: PerformanceConfig) -> Self
    where
        S: Into<String>,
    {
        let capacity = config.max_data_points;
        Self {
            session_id: session_id.into(),
            clock: system_clock,
            fps: RingBuffer::with_capacity(capacity),
            memory: RingBuffer::with_capacity(capacity),
            load_times: RingBuffer::with_capacity(capacity),
            errors: RingBuffer::with_capacity(capacity),
            error_count: 0,
            measurements: Measurements::with_capacity(capacity),
            alerts: AlertDispatcher::default(),
            config,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Current time in epoch milliseconds.
    #[must_use]
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn on_alert<F>(&mut self, callback: F)
    where
        F: Fn(&AlertEvent) + 'static,
    {
        self.alerts.on_alert(callback);
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<AlertEvent> {
        self.alerts.subscribe()
    }

    #[must_use]
    pub fn alerts_emitted(&self) -> u64 {
        self.alerts.emitted()
    }

    fn tag<T>(&self, sample: T) -> Recorded<T> {
        Recorded {
            session_id: self.session_id.clone(),
            sample,
        }
    }

    fn alert(&mut self, timestamp: i64, severity: Severity, kind: AlertKind, message: String) {
        self.alerts.emit(&AlertEvent {
            timestamp,
            severity,
            message,
            kind,
        });
    }

    pub fn record(&mut self, event: PerformanceEvent) {
        match event {
            PerformanceEvent::Fps(sample) => self.record_fps(sample),
            PerformanceEvent::Memory(sample) => self.record_memory(sample),
            PerformanceEvent::LoadTime(sample) => self.record_load_time(sample),
            PerformanceEvent::Error(sample) => self.record_error(sample),
        }
    }

    pub fn record_fps(&mut self, sample: FpsSample) {
        let recorded = self.tag(sample);
        self.fps.push(recorded);

        let threshold = self.config.low_fps_threshold;
        if sample.fps <= threshold {
            let severity = if sample.fps <= threshold / 2.0 {
                Severity::Error
            } else {
                Severity::Warning
            };
            self.alert(
                sample.timestamp,
                severity,
                AlertKind::LowFps,
                format!("Low FPS detected: {:.1}", sample.fps),
            );
        }
    }

    pub fn record_memory(&mut self, sample: MemorySample) {
        let recorded = self.tag(sample);
        self.memory.push(recorded);

        let usage = sample.usage_percent;
        let severity = if usage >= self.config.critical_memory_threshold {
            Some(Severity::Error)
        } else if usage > self.config.high_memory_threshold {
            Some(Severity::Warning)
        } else {
            None
        };
        if let Some(severity) = severity {
            self.alert(
                sample.timestamp,
                severity,
                AlertKind::HighMemory,
                format!("High memory usage: {usage:.1}%"),
            );
        }
    }

    pub fn record_load_time(&mut self, sample: LoadTimeSample) {
        let recorded = self.tag(sample);
        self.load_times.push(recorded);

        if sample.load_complete > self.config.slow_load_threshold_ms {
            self.alert(
                sample.timestamp,
                Severity::Warning,
                AlertKind::SlowLoad,
                format!("Long load time: {:.0}ms", sample.load_complete),
            );
        }
    }

    pub fn record_error(&mut self, sample: ErrorSample) {
        debug!(kind = %sample.kind, "recorded client error");
        let recorded = self.tag(sample);
        self.errors.push(recorded);
        self.error_count += 1;
    }

    /// Opens (or restarts) a named timed measurement.
    pub fn start_measure(&mut self, name: &str) {
        let now = self.now();
        self.measurements.start(name, now);
    }

    /// Closes a measurement, or returns `None` if `name` was never started.
    pub fn end_measure(&mut self, name: &str) -> Option<Measurement> {
        let now = self.now();
        self.measurements.end(name, now)
    }

    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.finished()
    }

    #[must_use]
    pub fn calculate_fps_statistics(&self) -> FpsStatistics {
        let decimals = self.config.average_decimals;
        let summary =
            StatisticsSummary::from_values(self.fps.iter().map(|r| r.sample.fps), decimals);
        let frame_times =
            StatisticsSummary::from_values(self.fps.iter().map(|r| r.sample.frame_time), decimals);
        FpsStatistics {
            summary,
            below_threshold: self
                .fps
                .iter()
                .filter(|r| r.sample.fps <= self.config.low_fps_threshold)
                .count(),
            average_frame_time: frame_times.average,
        }
    }

    #[must_use]
    pub fn calculate_memory_statistics(&self) -> MemoryStatistics {
        let summary = StatisticsSummary::from_values(
            self.memory.iter().map(|r| r.sample.usage_percent),
            self.config.average_decimals,
        );
        let count = |pred: &dyn Fn(f64) -> bool| {
            self.memory
                .iter()
                .filter(|r| pred(r.sample.usage_percent))
                .count()
        };
        MemoryStatistics {
            summary,
            peak_usage: count(&|u: f64| u > self.config.high_memory_threshold),
            low_usage: count(&|u: f64| u < self.config.low_memory_threshold),
            peak_used_bytes: self.memory.iter().map(|r| r.sample.used).max().unwrap_or(0),
        }
    }

    #[must_use]
    pub fn calculate_load_time_statistics(&self) -> LoadTimeStatistics {
        let decimals = self.config.average_decimals;
        let summary = StatisticsSummary::from_values(
            self.load_times.iter().map(|r| r.sample.load_complete),
            decimals,
        );
        let dom = StatisticsSummary::from_values(
            self.load_times.iter().map(|r| r.sample.dom_content_loaded),
            decimals,
        );
        LoadTimeStatistics {
            summary,
            average_dom_content_loaded: dom.average,
            slow_loads: self
                .load_times
                .iter()
                .filter(|r| r.sample.load_complete > self.config.slow_load_threshold_ms)
                .count(),
        }
    }

    #[must_use]
    pub fn calculate_error_statistics(&self) -> ErrorStatistics {
        let mut by_type = BTreeMap::new();
        for r in self.errors.iter() {
            *by_type.entry(r.sample.kind.clone()).or_insert(0) += 1;
        }
        ErrorStatistics {
            total: self.error_count,
            data_points: self.errors.len(),
            by_type,
            latest: self.errors.last().cloned(),
        }
    }

    #[must_use]
    pub fn calculate_all_statistics(&self) -> AllStatistics {
        AllStatistics {
            fps: self.calculate_fps_statistics(),
            memory: self.calculate_memory_statistics(),
            load_time: self.calculate_load_time_statistics(),
            errors: self.calculate_error_statistics(),
        }
    }

    #[must_use]
    pub fn get_current_stats(&self) -> CurrentStats {
        CurrentStats {
            session_id: self.session_id.clone(),
            fps: self.fps.last().map(|r| r.sample),
            memory: self.memory.last().map(|r| r.sample),
            load_time: self.load_times.last().map(|r| r.sample),
            error_count: self.error_count,
        }
    }

    /// Number of buffered samples per class: fps, memory, load time, errors.
    #[must_use]
    pub fn buffer_lens(&self) -> [usize; 4] {
        [
            self.fps.len(),
            self.memory.len(),
            self.load_times.len(),
            self.errors.len(),
        ]
    }

    /// Empties every buffer. Configuration and subscribers are kept.
    pub fn clear_data(&mut self) {
        self.fps.clear();
        self.memory.clear();
        self.load_times.clear();
        self.errors.clear();
        self.error_count = 0;
        self.measurements.clear();
        debug!(session_id = %self.session_id, "cleared performance data");
    }

    #[must_use]
    pub fn raw_data(&self) -> RawData {
        RawData {
            fps: self.fps.to_vec(),
            memory: self.memory.to_vec(),
            load_times: self.load_times.to_vec(),
            errors: self.errors.to_vec(),
            measurements: self.measurements.to_vec(),
        }
    }

    pub fn export_data(&self, format: ExportFormat) -> Result<String, ExportError> {
        self.export_data_with(format, &NoPrivacy)
    }

    /// Like [`export_data`](Self::export_data), passing the raw data through
    /// `privacy` first. Statistics are computed before anonymization.
    pub fn export_data_with<P>(
        &self,
        format: ExportFormat,
        privacy: &P,
    ) -> Result<String, ExportError>
    where
        P: Privacy + ?Sized,
    {
        let document = ExportDocument {
            session_id: privacy.anonymize_session_id(&self.session_id),
            exported_at: self.now(),
            statistics: self.calculate_all_statistics(),
            raw_data: privacy.anonymize_data(self.raw_data()),
        };
        document.render(format)
    }
}
