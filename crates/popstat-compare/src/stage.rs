use std::collections::BTreeMap;

use popstat_metrics::{Metric, MetricSet, PerMetric, SessionRecord};
use popstat_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    CompareError, ComparisonConfig, Trend, engine::usable_metrics, result::relative_change,
};

/// Summary of one player's sessions on a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatistics {
    pub stage_id: String,
    pub play_count: usize,
    /// Mean metrics over the stage's sessions.
    pub metrics: MetricSet,
    pub average_score: f64,
    pub best_score: u64,
    /// `1 - cv` of the final scores in `0.0..=1.0`, or zero below two plays.
    pub consistency: f64,
}

impl StageStatistics {
    fn new(stage_id: String, sessions: &[(SessionRecord, MetricSet)]) -> Option<Self> {
        let metrics = sessions.iter().map(|(_, m)| *m).collect::<Vec<_>>();
        let metrics = MetricSet::mean(&metrics)?;
        #[expect(clippy::cast_precision_loss)]
        let scores = DescriptiveStats::new(sessions.iter().map(|(r, _)| r.final_score as f64))?;
        let consistency = if scores.count < 2 || scores.mean == 0.0 {
            0.0
        } else {
            (1.0 - scores.std_dev / scores.mean).clamp(0.0, 1.0)
        };
        Some(Self {
            stage_id,
            play_count: sessions.len(),
            metrics,
            average_score: scores.mean,
            best_score: sessions.iter().map(|(r, _)| r.final_score).max().unwrap_or(0),
            consistency,
        })
    }
}

/// How the `second` stage compares with the `first`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePairComparison {
    pub first: String,
    pub second: String,
    /// `second - first`.
    pub deltas: MetricSet,
    pub trends: PerMetric<Trend>,
}

impl StagePairComparison {
    fn new(first: &StageStatistics, second: &StageStatistics, stable_threshold: f64) -> Self {
        let deltas = second.metrics.delta(&first.metrics);
        let trends = deltas.map(|metric, delta| {
            Trend::classify(relative_change(*delta, *first.metrics.get(metric)), stable_threshold)
        });
        Self {
            first: first.stage_id.clone(),
            second: second.stage_id.clone(),
            deltas,
            trends,
        }
    }

    /// Key of the pair in [`StageComparison::comparisons`].
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_vs_{}", self.first, self.second)
    }
}

/// Stage orderings, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRankings {
    pub by_metric: PerMetric<Vec<String>>,
    /// By summed position over [`by_metric`](Self::by_metric), then by accuracy.
    pub overall: Vec<String>,
    pub best_performing_stage: String,
    /// Last of [`overall`](Self::overall).
    pub most_difficult_stage: String,
}

impl StageRankings {
    fn new(stages: &BTreeMap<String, StageStatistics>) -> Option<Self> {
        let by_metric = PerMetric::from_fn(|metric| {
            let mut ids = stages.keys().cloned().collect::<Vec<_>>();
            // stable sort keeps ties in id order
            ids.sort_by(|a, b| {
                let value = |id: &String| *stages[id].metrics.get(metric);
                value(b).total_cmp(&value(a))
            });
            ids
        });

        let position_sum = |id: &String| -> usize {
            by_metric
                .iter()
                .filter_map(|(_, ids)| ids.iter().position(|other| other == id))
                .sum()
        };
        let mut overall = stages.keys().cloned().collect::<Vec<_>>();
        overall.sort_by(|a, b| {
            position_sum(a).cmp(&position_sum(b)).then_with(|| {
                let accuracy = |id: &String| stages[id].metrics.get(Metric::Accuracy);
                accuracy(b).total_cmp(accuracy(a))
            })
        });

        Some(Self {
            best_performing_stage: overall.first()?.clone(),
            most_difficult_stage: overall.last()?.clone(),
            overall,
            by_metric,
        })
    }
}

/// Side-by-side comparison of every stage one player has played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageComparison {
    pub player_id: String,
    pub total_stages: usize,
    pub total_comparisons: usize,
    pub stages: BTreeMap<String, StageStatistics>,
    /// Every pair of stages, keyed `"{first}_vs_{second}"` with `first < second`.
    pub comparisons: BTreeMap<String, StagePairComparison>,
    pub rankings: StageRankings,
    /// Stages played fewer than `min_baseline_sessions` times.
    pub needs_practice: Vec<String>,
    /// Epoch milliseconds.
    pub computed_at: i64,
}

impl StageComparison {
    /// Groups `player_id`'s sessions by stage and compares the stages pairwise.
    ///
    /// Records of other players, records without a stage, and records that
    /// fail validation are ignored.
    ///
    /// # Errors
    ///
    /// [`CompareError::InsufficientStages`] when fewer than two stages remain.
    pub fn analyze<I>(
        player_id: &str,
        records: I,
        config: &ComparisonConfig,
        computed_at: i64,
    ) -> Result<Self, CompareError>
    where
        I: IntoIterator<Item = SessionRecord>,
    {
        let records = records
            .into_iter()
            .filter(|r| r.player_id.as_deref() == Some(player_id) && r.stage_id.is_some());
        let mut grouped: BTreeMap<String, Vec<(SessionRecord, MetricSet)>> = BTreeMap::new();
        for (record, metrics) in usable_metrics(records) {
            if let Some(stage_id) = record.stage_id.clone() {
                grouped.entry(stage_id).or_default().push((record, metrics));
            }
        }
        if grouped.len() < 2 {
            debug!(player_id, stages = grouped.len(), "too few stages to compare");
            return Err(CompareError::InsufficientStages {
                found: grouped.len(),
            });
        }

        let stages = grouped
            .into_iter()
            .filter_map(|(stage_id, sessions)| {
                StageStatistics::new(stage_id.clone(), &sessions).map(|stats| (stage_id, stats))
            })
            .collect::<BTreeMap<_, _>>();
        let ordered = stages.values().collect::<Vec<_>>();
        let mut comparisons = BTreeMap::new();
        for (i, first) in ordered.iter().enumerate() {
            for second in &ordered[i + 1..] {
                let pair = StagePairComparison::new(first, second, config.stable_threshold);
                comparisons.insert(pair.key(), pair);
            }
        }
        let rankings = StageRankings::new(&stages).ok_or(CompareError::InsufficientStages {
            found: stages.len(),
        })?;
        let needs_practice = stages
            .values()
            .filter(|s| s.play_count < config.min_baseline_sessions)
            .map(|s| s.stage_id.clone())
            .collect();

        Ok(Self {
            player_id: player_id.to_owned(),
            total_stages: stages.len(),
            total_comparisons: comparisons.len(),
            stages,
            comparisons,
            rankings,
            needs_practice,
            computed_at,
        })
    }
}
