use std::{cell::RefCell, rc::Rc, time::Duration};

use tokio::{
    task::{JoinHandle, LocalSet},
    time,
};
use tracing::{debug, info};

use crate::{FpsSample, MemoryReading, MemorySample, StatisticsAggregator};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("performance probe unavailable: {reason}")]
pub struct ProbeError {
    reason: String,
}

impl ProbeError {
    pub fn new<R>(reason: R) -> Self
    where
        R: Into<String>,
    {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum MonitorError {
    #[display("performance monitor is already running")]
    #[from(skip)]
    AlreadyStarted,
    #[display("{_0}")]
    Probe(ProbeError),
}

/// Host-side source of live measurements.
pub trait PerformanceProbe {
    /// Acquires whatever the memory sampler needs before its timer starts.
    fn prepare_memory(&self) -> Result<(), ProbeError> {
        Ok(())
    }

    fn sample_fps(&self) -> Option<f64>;

    fn sample_memory(&self) -> Option<MemoryReading>;
}

/// Timer tasks owned by a running monitor. Dropping the set aborts them.
#[derive(Debug, Default)]
struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        if !self.handles.is_empty() {
            debug!(timers = self.handles.len(), "released performance timers");
        }
    }
}

/// Periodically samples a [`PerformanceProbe`] into a shared
/// [`StatisticsAggregator`].
pub struct PerformanceMonitor<P> {
    aggregator: Rc<RefCell<StatisticsAggregator>>,
    probe: Rc<P>,
    timers: Option<TimerSet>,
}

impl<P> PerformanceMonitor<P>
where
    P: PerformanceProbe + 'static,
{
    pub fn new(aggregator: StatisticsAggregator, probe: P) -> Self {
        Self {
            aggregator: Rc::new(RefCell::new(aggregator)),
            probe: Rc::new(probe),
            timers: None,
        }
    }

    #[must_use]
    pub fn aggregator(&self) -> Rc<RefCell<StatisticsAggregator>> {
        Rc::clone(&self.aggregator)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timers.is_some()
    }

    /// Spawns the sampling timers on `local`.
    ///
    /// If any step fails, timers spawned so far are released before the
    /// error is returned.
    pub fn start(&mut self, local: &LocalSet) -> Result<(), MonitorError> {
        if self.timers.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }
        let config = self.aggregator.borrow().config().clone();
        let mut timers = TimerSet::default();

        let fps_period = Duration::from_millis(config.fps_interval_ms.max(1));
        timers.push(self.spawn_sampler(local, fps_period, |probe, aggregator| {
            if let Some(fps) = probe.sample_fps() {
                let now = aggregator.now();
                aggregator.record_fps(FpsSample::new(now, fps));
            }
        }));

        if config.memory_monitoring {
            self.probe.prepare_memory()?;
            let memory_period = Duration::from_millis(config.memory_interval_ms.max(1));
            timers.push(self.spawn_sampler(local, memory_period, |probe, aggregator| {
                if let Some(reading) = probe.sample_memory() {
                    let now = aggregator.now();
                    aggregator.record_memory(MemorySample::new(now, reading));
                }
            }));
        }

        info!(
            session_id = %self.aggregator.borrow().session_id(),
            timers = timers.handles.len(),
            "performance monitoring started"
        );
        self.timers = Some(timers);
        Ok(())
    }

    fn spawn_sampler<F>(&self, local: &LocalSet, period: Duration, mut tick: F) -> JoinHandle<()>
    where
        F: FnMut(&P, &mut StatisticsAggregator) + 'static,
    {
        let probe = Rc::clone(&self.probe);
        let aggregator = Rc::clone(&self.aggregator);
        local.spawn_local(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                tick(&probe, &mut aggregator.borrow_mut());
            }
        })
    }

    /// Stops the timers, keeping collected data.
    pub fn stop(&mut self) {
        if self.timers.take().is_some() {
            info!("performance monitoring stopped");
        }
    }

    /// Stops the timers and clears all collected data.
    pub fn destroy(&mut self) {
        self.stop();
        self.aggregator.borrow_mut().clear_data();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::PerformanceConfig;

    struct FixedProbe {
        fps: f64,
        fail_memory: bool,
        prepared: Cell<bool>,
    }

    impl FixedProbe {
        fn new(fps: f64) -> Self {
            Self {
                fps,
                fail_memory: false,
                prepared: Cell::new(false),
            }
        }
    }

    impl PerformanceProbe for FixedProbe {
        fn prepare_memory(&self) -> Result<(), ProbeError> {
            if self.fail_memory {
                return Err(ProbeError::new("memory API not supported"));
            }
            self.prepared.set(true);
            Ok(())
        }

        fn sample_fps(&self) -> Option<f64> {
            Some(self.fps)
        }

        fn sample_memory(&self) -> Option<MemoryReading> {
            Some(MemoryReading {
                used: 10,
                total: 20,
                limit: 100,
            })
        }
    }

    fn monitor(probe: FixedProbe) -> PerformanceMonitor<FixedProbe> {
        let aggregator =
            StatisticsAggregator::new("s1", PerformanceConfig::default()).with_clock(|| 0);
        PerformanceMonitor::new(aggregator, probe)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_sample_periodically() {
        let local = LocalSet::new();
        let mut monitor = monitor(FixedProbe::new(60.0));
        monitor.start(&local).unwrap();
        assert!(monitor.probe.prepared.get());

        local.run_until(time::sleep(Duration::from_millis(3500))).await;

        let [fps, memory, _, _] = monitor.aggregator().borrow().buffer_lens();
        assert!((3..=4).contains(&fps), "fps samples: {fps}");
        assert!((1..=2).contains(&memory), "memory samples: {memory}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_fails() {
        let local = LocalSet::new();
        let mut monitor = monitor(FixedProbe::new(60.0));
        monitor.start(&local).unwrap();
        assert_eq!(monitor.start(&local), Err(MonitorError::AlreadyStarted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_releases_timers() {
        let local = LocalSet::new();
        let probe = FixedProbe {
            fail_memory: true,
            ..FixedProbe::new(60.0)
        };
        let mut monitor = monitor(probe);

        let err = monitor.start(&local).unwrap_err();
        assert!(matches!(err, MonitorError::Probe(_)));
        assert!(!monitor.is_running());

        local.run_until(time::sleep(Duration::from_millis(3000))).await;
        assert_eq!(monitor.aggregator().borrow().buffer_lens(), [0, 0, 0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_timers_and_clears() {
        let local = LocalSet::new();
        let mut monitor = monitor(FixedProbe::new(20.0));
        monitor.start(&local).unwrap();
        local.run_until(time::sleep(Duration::from_millis(1500))).await;
        assert!(monitor.aggregator().borrow().buffer_lens()[0] > 0);

        monitor.destroy();
        assert!(!monitor.is_running());
        assert_eq!(monitor.aggregator().borrow().buffer_lens(), [0, 0, 0, 0]);

        local.run_until(time::sleep(Duration::from_millis(3000))).await;
        assert_eq!(monitor.aggregator().borrow().buffer_lens(), [0, 0, 0, 0]);

        // a destroyed monitor can be started again
        monitor.start(&local).unwrap();
        assert!(monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_fps_probe_alerts_every_tick() {
        let local = LocalSet::new();
        let mut monitor = monitor(FixedProbe::new(20.0));
        let mut rx = monitor.aggregator().borrow_mut().subscribe();
        monitor.start(&local).unwrap();

        local.run_until(time::sleep(Duration::from_millis(2500))).await;
        let fps = monitor.aggregator().borrow().buffer_lens()[0];
        let alerts = std::iter::from_fn(|| rx.try_recv().ok()).count();
        assert_eq!(alerts, fps);
    }
}
