use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use chrono::Utc;
use futures::{
    FutureExt as _,
    future::{LocalBoxFuture, Shared},
};
use popstat_metrics::{MetricSet, MetricsCalculator, PerMetric, SessionRecord};
use popstat_stats::{
    percentiles::{Quartiles, percentile_rank},
    trend::LinearTrend,
};
use tracing::{debug, info, warn};

use crate::{
    BenchmarkSummary, CacheStats, CompareError, ComparisonConfig, ComparisonParams,
    ComparisonResult, DataQuality, Fingerprint, ImprovementSuggestionGenerator, RecordQuery,
    ResultCache, StageComparison, Storage,
};

const MILLIS_PER_DAY: i64 = 86_400_000;

type Computation = Shared<LocalBoxFuture<'static, Result<Rc<ComparisonResult>, CompareError>>>;

/// Options of [`ComparisonEngine::compare_past`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PastParams {
    /// Number of prior sessions to average; `None` or zero uses the default.
    pub window_size: Option<usize>,
}

/// Options of [`ComparisonEngine::compare_benchmark`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenchmarkParams {
    /// Only sessions started within this many days count; `None` or zero uses the default.
    pub recency_window_days: Option<u32>,
}

struct EngineState {
    cache: ResultCache,
    in_flight: HashMap<Fingerprint, Computation>,
    /// Bumped by [`ComparisonEngine::destroy`]; computations started under an
    /// older generation neither cache nor unregister themselves.
    generation: u64,
}

/// Compares a session against the player's history, other players, or the
/// player's history on one stage.
///
/// The engine is single-threaded. Identical requests share one computation
/// while it runs and one cached result afterwards.
pub struct ComparisonEngine<S> {
    storage: Rc<S>,
    config: Rc<ComparisonConfig>,
    suggestions: ImprovementSuggestionGenerator,
    clock: fn() -> i64,
    state: Rc<RefCell<EngineState>>,
}

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

impl<S> ComparisonEngine<S>
where
    S: Storage + 'static,
{
    /// Creates an engine with an empty cache, reading the system clock.
    pub fn new(storage: S, config: ComparisonConfig) -> Self {
        let cache = ResultCache::new(config.cache_capacity, config.cache_ttl());
        Self {
            storage: Rc::new(storage),
            suggestions: ImprovementSuggestionGenerator::new(config.stable_threshold),
            config: Rc::new(config),
            clock: system_clock,
            state: Rc::new(RefCell::new(EngineState {
                cache,
                in_flight: HashMap::new(),
                generation: 0,
            })),
        }
    }

    /// Replaces the epoch-millisecond clock used for recency windows and timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration the engine was created with.
    #[must_use]
    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// The backing store, for callers that also write to it.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Compares `target` with the mean of the same player's preceding sessions.
    pub async fn compare_past(
        &self,
        target: &SessionRecord,
        params: PastParams,
    ) -> Result<Rc<ComparisonResult>, CompareError> {
        target.require_player_id()?;
        let params = ComparisonParams::Past {
            window_size: self.config.window_size(params.window_size),
        };
        self.compare(target, params).await
    }

    /// Ranks `target` among other players' recent sessions.
    pub async fn compare_benchmark(
        &self,
        target: &SessionRecord,
        params: BenchmarkParams,
    ) -> Result<Rc<ComparisonResult>, CompareError> {
        let params = ComparisonParams::Benchmark {
            recency_window_days: self.config.recency_days(params.recency_window_days),
        };
        self.compare(target, params).await
    }

    /// Like [`compare_past`](Self::compare_past), restricted to sessions on `stage_id`.
    pub async fn compare_stage(
        &self,
        stage_id: &str,
        target: &SessionRecord,
        session_count: Option<usize>,
    ) -> Result<Rc<ComparisonResult>, CompareError> {
        target.require_player_id()?;
        let params = ComparisonParams::Stage {
            stage_id: stage_id.to_owned(),
            session_count: self.config.window_size(session_count),
        };
        self.compare(target, params).await
    }

    /// Compares every stage the player has played with each other.
    ///
    /// Reads the whole store; the result is not cached.
    pub async fn compare_stages(&self, player_id: &str) -> Result<StageComparison, CompareError> {
        let records = self.storage.get_data(&self.config.store_name, None).await?;
        let comparison =
            StageComparison::analyze(player_id, records, &self.config, (self.clock)())?;
        debug!(
            player_id,
            stages = comparison.total_stages,
            best = %comparison.rankings.best_performing_stage,
            "compared stages"
        );
        Ok(comparison)
    }

    /// Drops cached results and forgets in-flight computations.
    ///
    /// Callers already awaiting a computation still receive its outcome, but
    /// nothing computed before this call reaches the cache.
    pub fn destroy(&self) {
        let mut state = self.state.borrow_mut();
        state.generation += 1;
        state.in_flight.clear();
        state.cache.clear();
        info!(generation = state.generation, "comparison engine reset");
    }

    /// Counters of the result cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.state.borrow().cache.stats()
    }

    /// Number of live cached results. Expired entries are dropped first.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let expired = state.cache.purge_expired();
        if expired > 0 {
            debug!(expired, "purged expired comparisons");
        }
        state.cache.len()
    }

    /// Number of computations currently awaited by at least one caller.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.state.borrow().in_flight.len()
    }

    async fn compare(
        &self,
        target: &SessionRecord,
        params: ComparisonParams,
    ) -> Result<Rc<ComparisonResult>, CompareError> {
        let target_metrics = MetricsCalculator::calculate(target)?;
        let fingerprint = Fingerprint::new(target.session_id.as_str(), params);

        let mut waiter = {
            let mut state = self.state.borrow_mut();
            if let Some(result) = state.cache.get(&fingerprint) {
                debug!(%fingerprint, "comparison cache hit");
                return Ok(result);
            }
            let computation = if let Some(pending) = state.in_flight.get(&fingerprint) {
                debug!(%fingerprint, "joining in-flight comparison");
                pending.clone()
            } else {
                let computation = self.start(
                    target.clone(),
                    target_metrics,
                    fingerprint.clone(),
                    state.generation,
                );
                state.in_flight.insert(fingerprint.clone(), computation.clone());
                computation
            };
            Waiter {
                state: &self.state,
                fingerprint,
                computation,
            }
        };
        (&mut waiter.computation).await
    }

    fn start(
        &self,
        target: SessionRecord,
        target_metrics: MetricSet,
        fingerprint: Fingerprint,
        generation: u64,
    ) -> Computation {
        let storage = Rc::clone(&self.storage);
        let config = Rc::clone(&self.config);
        let state = Rc::clone(&self.state);
        let suggestions = self.suggestions;
        let now = (self.clock)();

        async move {
            debug!(%fingerprint, "computing comparison");
            let outcome = compute(&*storage, &config, &target, target_metrics, &fingerprint, now)
                .await
                .map(|mut result| {
                    result.suggestions = suggestions.generate(&result);
                    Rc::new(result)
                });

            let mut state = state.borrow_mut();
            if state.generation == generation {
                state.in_flight.remove(&fingerprint);
                if let Ok(result) = &outcome {
                    state.cache.insert(fingerprint, Rc::clone(result));
                }
            } else {
                debug!(%fingerprint, "engine reset during comparison, result not cached");
            }
            if let Err(err) = &outcome {
                warn!(error = %err, "comparison failed");
            }
            outcome
        }
        .boxed_local()
        .shared()
    }
}

/// A caller's handle on an in-flight computation.
///
/// When the last caller gives up before the computation finishes, the
/// registry entry goes too, so the next request starts afresh.
struct Waiter<'a> {
    state: &'a RefCell<EngineState>,
    fingerprint: Fingerprint,
    computation: Computation,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        // a finished handle no longer matches, and the registry holds one more
        let abandoned = state.in_flight.get(&self.fingerprint).is_some_and(|pending| {
            pending.ptr_eq(&self.computation) && pending.strong_count() == Some(2)
        });
        if abandoned {
            state.in_flight.remove(&self.fingerprint);
            debug!(fingerprint = %self.fingerprint, "comparison abandoned by every caller");
        }
    }
}

async fn compute<S>(
    storage: &S,
    config: &ComparisonConfig,
    target: &SessionRecord,
    target_metrics: MetricSet,
    fingerprint: &Fingerprint,
    now: i64,
) -> Result<ComparisonResult, CompareError>
where
    S: Storage,
{
    match fingerprint.params() {
        ComparisonParams::Past { window_size } => {
            compare_history(
                storage,
                config,
                target,
                target_metrics,
                fingerprint,
                None,
                *window_size,
                now,
            )
            .await
        }
        ComparisonParams::Stage {
            stage_id,
            session_count,
        } => {
            compare_history(
                storage,
                config,
                target,
                target_metrics,
                fingerprint,
                Some(stage_id.as_str()),
                *session_count,
                now,
            )
            .await
        }
        ComparisonParams::Benchmark {
            recency_window_days,
        } => {
            compare_population(
                storage,
                config,
                target,
                target_metrics,
                fingerprint,
                *recency_window_days,
                now,
            )
            .await
        }
    }
}

/// Computes metrics for each record, skipping records that fail validation.
pub(crate) fn usable_metrics<I>(records: I) -> impl Iterator<Item = (SessionRecord, MetricSet)>
where
    I: IntoIterator<Item = SessionRecord>,
{
    records
        .into_iter()
        .filter_map(|record| match MetricsCalculator::calculate(&record) {
            Ok(metrics) => Some((record, metrics)),
            Err(err) => {
                warn!(error = %err, "skipping invalid stored session");
                None
            }
        })
}

#[expect(clippy::too_many_arguments)]
async fn compare_history<S>(
    storage: &S,
    config: &ComparisonConfig,
    target: &SessionRecord,
    target_metrics: MetricSet,
    fingerprint: &Fingerprint,
    stage_id: Option<&str>,
    window_size: usize,
    now: i64,
) -> Result<ComparisonResult, CompareError>
where
    S: Storage,
{
    let player_id = target.require_player_id()?;
    let query = RecordQuery::start_time_between(i64::MIN, target.start_time);
    let mut prior = storage
        .get_data(&config.store_name, Some(&query))
        .await?
        .into_iter()
        .filter(|r| {
            r.player_id.as_deref() == Some(player_id)
                && r.session_id != target.session_id
                && r.start_time < target.start_time
                && stage_id.is_none_or(|stage| r.stage_id.as_deref() == Some(stage))
        })
        .collect::<Vec<_>>();
    prior.sort_by(|a, b| b.start_time.cmp(&a.start_time));

    // most recent first
    let window = usable_metrics(prior)
        .take(window_size)
        .map(|(_, metrics)| metrics)
        .collect::<Vec<_>>();

    let kind = fingerprint.kind();
    let target_id = fingerprint.target_id().to_owned();
    let Some(baseline) =
        MetricSet::mean(&window).filter(|_| window.len() >= config.min_baseline_sessions)
    else {
        debug!(%fingerprint, sessions = window.len(), "not enough prior sessions");
        return Ok(ComparisonResult::insufficient(
            kind,
            target_id,
            target_metrics,
            window.len(),
            now,
        ));
    };

    let mut result = ComparisonResult::against_baseline(
        kind,
        target_id,
        target_metrics,
        baseline,
        window.len(),
        config.stable_threshold,
        now,
    );
    result.history_trend = Some(PerMetric::from_fn(|metric| {
        let chronological = window.iter().rev().map(|m| *m.get(metric)).collect::<Vec<_>>();
        LinearTrend::from_values(&chronological)
    }));
    Ok(result)
}

async fn compare_population<S>(
    storage: &S,
    config: &ComparisonConfig,
    target: &SessionRecord,
    target_metrics: MetricSet,
    fingerprint: &Fingerprint,
    recency_window_days: u32,
    now: i64,
) -> Result<ComparisonResult, CompareError>
where
    S: Storage,
{
    let since = now.saturating_sub(i64::from(recency_window_days).saturating_mul(MILLIS_PER_DAY));
    let query = RecordQuery::start_time_between(since, now);
    let records = storage
        .get_data(&config.store_name, Some(&query))
        .await?
        .into_iter()
        .filter(|r| {
            r.session_id != target.session_id
                && (target.player_id.is_none() || r.player_id != target.player_id)
        });

    let mut players = HashSet::new();
    let mut population = vec![];
    for (record, metrics) in usable_metrics(records) {
        if let Some(player_id) = record.player_id {
            players.insert(player_id);
        }
        population.push(metrics);
    }

    let kind = fingerprint.kind();
    let target_id = fingerprint.target_id().to_owned();
    let Some(baseline) =
        MetricSet::mean(&population).filter(|_| population.len() >= config.min_baseline_sessions)
    else {
        debug!(%fingerprint, sessions = population.len(), "benchmark population too small");
        return Ok(ComparisonResult::insufficient(
            kind,
            target_id,
            target_metrics,
            population.len(),
            now,
        ));
    };

    let values = PerMetric::from_fn(|metric| {
        population
            .iter()
            .map(|m| *m.get(metric))
            .collect::<Vec<_>>()
    });
    let mut result = ComparisonResult::against_baseline(
        kind,
        target_id,
        target_metrics,
        baseline,
        population.len(),
        config.stable_threshold,
        now,
    );
    result.percentile_rank = Some(values.map(|metric, values| {
        percentile_rank(values, *target_metrics.get(metric)).unwrap_or(0.0)
    }));
    result.benchmark = Some(BenchmarkSummary {
        total_players: players.len(),
        total_sessions: population.len(),
        quality: DataQuality::from_player_count(players.len()),
        quartiles: values.map(|_, values| Quartiles::new(values).unwrap_or_default()),
    });
    Ok(result)
}
