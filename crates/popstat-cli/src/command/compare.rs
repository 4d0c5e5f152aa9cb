use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context as _;
use popstat_compare::{
    BenchmarkParams, CompareError, ComparisonConfig, ComparisonEngine, ComparisonResult,
    MemoryStorage, PastParams,
};
use popstat_metrics::SessionRecord;
use tracing::info;

use crate::util::{self, Output};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum CompareMode {
    #[default]
    Past,
    Benchmark,
    Stage,
    Stages,
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CompareArg {
    /// Session collection JSON file
    #[arg(long)]
    sessions: PathBuf,
    /// Session id to compare
    #[arg(long)]
    target: String,
    /// Comparison mode (past, benchmark, stage, stages)
    ///
    /// `stages` ranks every stage played by the target's player.
    #[arg(long, default_value = "past")]
    mode: CompareMode,
    /// Number of prior sessions in the baseline (past and stage modes)
    #[arg(long)]
    window: Option<usize>,
    /// Benchmark recency window in days
    #[arg(long)]
    recency_days: Option<u32>,
    /// Stage to compare on; defaults to the target session's stage
    #[arg(long)]
    stage: Option<String>,
    /// Comparison config JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &CompareArg) -> anyhow::Result<()> {
    let config: ComparisonConfig = util::read_config_file(arg.config.as_deref())?;
    let collection = util::read_sessions_file(&arg.sessions)?;
    let target = collection
        .sessions
        .iter()
        .find(|s| s.session_id == arg.target)
        .cloned()
        .with_context(|| {
            format!(
                "Session {} not found in {}",
                arg.target,
                arg.sessions.display()
            )
        })?;
    info!(
        sessions = collection.sessions.len(),
        target = %target.session_id,
        "loaded session collection"
    );

    let storage = MemoryStorage::with_records(config.store_name.clone(), collection.sessions);
    let engine = ComparisonEngine::new(storage, config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let output = arg.output.as_deref();
    let result = match arg.mode {
        CompareMode::Past => {
            let params = PastParams {
                window_size: arg.window,
            };
            runtime.block_on(engine.compare_past(&target, params))
        }
        CompareMode::Benchmark => {
            let params = BenchmarkParams {
                recency_window_days: arg.recency_days,
            };
            runtime.block_on(engine.compare_benchmark(&target, params))
        }
        CompareMode::Stage => {
            let stage = resolve_stage(arg.stage.as_deref(), &target)?;
            runtime.block_on(engine.compare_stage(stage, &target, arg.window))
        }
        CompareMode::Stages => {
            let player_id = target
                .player_id
                .as_deref()
                .with_context(|| format!("Session {} has no player id", target.session_id))?;
            let comparison = runtime
                .block_on(engine.compare_stages(player_id))
                .with_context(|| format!("Failed to compare stages of player {player_id}"))?;
            info!(
                stages = comparison.total_stages,
                best = %comparison.rankings.best_performing_stage,
                most_difficult = %comparison.rankings.most_difficult_stage,
                "stage comparison finished"
            );
            Output::save_json(&comparison, output)?;
            return Ok(());
        }
    };
    save_result(result, &target, output)
}

/// Stage of a stage comparison: `--stage` wins over the target's own stage.
fn resolve_stage<'a>(
    requested: Option<&'a str>,
    target: &'a SessionRecord,
) -> anyhow::Result<&'a str> {
    requested.or(target.stage_id.as_deref()).with_context(|| {
        format!(
            "Session {} has no stage id; pass --stage to choose one",
            target.session_id
        )
    })
}

fn save_result(
    result: Result<Rc<ComparisonResult>, CompareError>,
    target: &SessionRecord,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let result =
        result.with_context(|| format!("Failed to compare session {}", target.session_id))?;
    info!(
        overall = %result.overall,
        sample_size = result.sample_size,
        strengths = ?result.strengths,
        weaknesses = ?result.weaknesses,
        suggestions = ?result.suggestions,
        "comparison finished"
    );
    Output::save_json(&*result, output)?;
    Ok(())
}
