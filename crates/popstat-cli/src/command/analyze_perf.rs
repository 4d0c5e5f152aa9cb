use std::path::PathBuf;

use anyhow::Context as _;
use popstat_perf::{ExportFormat, PerformanceConfig, PerformanceLog, StatisticsAggregator};
use tracing::{debug, info};

use crate::{
    anonymize::SessionAnonymizer,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AnalyzePerfArg {
    /// Performance log JSON file
    #[arg(long)]
    samples: PathBuf,
    /// Export format (json, csv)
    #[arg(long, default_value = "json")]
    format: ExportFormat,
    /// Replace session ids and drop error messages in the export
    #[arg(long)]
    anonymize: bool,
    /// Performance config JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnalyzePerfArg) -> anyhow::Result<()> {
    let config: PerformanceConfig = util::read_config_file(arg.config.as_deref())?;
    let log: PerformanceLog = util::read_json_file("performance log", &arg.samples)?;
    let event_count = log.events.len();

    let aggregator = replay(log, config);
    let current = aggregator.get_current_stats();
    info!(
        session = %current.session_id,
        events = event_count,
        fps = ?current.fps.map(|s| s.fps),
        memory_percent = ?current.memory.map(|s| s.usage_percent),
        load_complete_ms = ?current.load_time.map(|s| s.load_complete),
        errors = current.error_count,
        alerts = aggregator.alerts_emitted(),
        "replayed performance log"
    );

    let exported = if arg.anonymize {
        aggregator.export_data_with(arg.format, &SessionAnonymizer::default())
    } else {
        aggregator.export_data(arg.format)
    }
    .with_context(|| format!("Failed to export statistics as {}", arg.format))?;

    Output::save_text(&exported, arg.output.as_deref())?;
    Ok(())
}

fn replay(log: PerformanceLog, config: PerformanceConfig) -> StatisticsAggregator {
    let mut aggregator = StatisticsAggregator::new(log.session_id, config);
    aggregator.on_alert(|alert| debug!(kind = %alert.kind, timestamp = alert.timestamp, "alert"));
    for event in log.events {
        aggregator.record(event);
    }
    aggregator
}
