use popstat_metrics::Metric;
use serde::{Deserialize, Serialize};

use crate::{ComparisonResult, Trend};

/// Improvement suggestion codes, rendered to text by the UI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum Suggestion {
    #[display("improve-accuracy")]
    ImproveAccuracy,
    #[display("maintain-combo")]
    MaintainCombo,
    #[display("increase-pace")]
    IncreasePace,
    #[display("play-more-sessions")]
    PlayMoreSessions,
    #[display("try-new-challenge")]
    TryNewChallenge,
}

impl Suggestion {
    /// The suggestion addressing a weak `metric`.
    #[must_use]
    pub const fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::Accuracy => Self::ImproveAccuracy,
            Metric::ComboEfficiency => Self::MaintainCombo,
            Metric::ScorePerMinute => Self::IncreasePace,
        }
    }
}

const LOW_PERCENTILE: f64 = 25.0;

#[derive(Debug, Clone, Copy)]
enum Condition {
    /// Benchmark rank below [`LOW_PERCENTILE`].
    LowPercentile,
    /// Relative change below the negative stable threshold.
    Decline,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    metric: Metric,
    condition: Condition,
}

const RULES: [Rule; 6] = [
    Rule {
        metric: Metric::Accuracy,
        condition: Condition::LowPercentile,
    },
    Rule {
        metric: Metric::Accuracy,
        condition: Condition::Decline,
    },
    Rule {
        metric: Metric::ComboEfficiency,
        condition: Condition::LowPercentile,
    },
    Rule {
        metric: Metric::ComboEfficiency,
        condition: Condition::Decline,
    },
    Rule {
        metric: Metric::ScorePerMinute,
        condition: Condition::LowPercentile,
    },
    Rule {
        metric: Metric::ScorePerMinute,
        condition: Condition::Decline,
    },
];

impl Rule {
    /// Impact in `0.0..=1.0` when the rule fires.
    fn evaluate(self, result: &ComparisonResult, stable_threshold: f64) -> Option<f64> {
        match self.condition {
            Condition::LowPercentile => {
                let rank = *result.percentile_rank.as_ref()?.get(self.metric);
                (rank < LOW_PERCENTILE).then(|| (LOW_PERCENTILE - rank) / LOW_PERCENTILE)
            }
            Condition::Decline => {
                let change = *result.relative_changes.as_ref()?.get(self.metric);
                (change < -stable_threshold).then(|| change.abs().min(1.0))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Finding {
    suggestion: Suggestion,
    metric: Metric,
    impact: f64,
}

/// Maps a finished comparison to an ordered list of suggestions.
#[derive(Debug, Clone, Copy)]
pub struct ImprovementSuggestionGenerator {
    stable_threshold: f64,
}

impl ImprovementSuggestionGenerator {
    /// Declines beyond `stable_threshold` trigger suggestions.
    #[must_use]
    pub const fn new(stable_threshold: f64) -> Self {
        Self { stable_threshold }
    }

    /// Deterministic: the same result always yields the same list, ordered by
    /// impact and then by metric priority.
    #[must_use]
    pub fn generate(&self, result: &ComparisonResult) -> Vec<Suggestion> {
        if result.insufficient_data {
            return vec![Suggestion::PlayMoreSessions];
        }

        let mut findings: Vec<Finding> = vec![];
        for rule in RULES {
            let Some(impact) = rule.evaluate(result, self.stable_threshold) else {
                continue;
            };
            let suggestion = Suggestion::for_metric(rule.metric);
            match findings.iter_mut().find(|f| f.suggestion == suggestion) {
                Some(existing) => existing.impact = existing.impact.max(impact),
                None => findings.push(Finding {
                    suggestion,
                    metric: rule.metric,
                    impact,
                }),
            }
        }

        if findings.is_empty() {
            let declining = result
                .trends
                .as_ref()
                .is_some_and(|t| t.iter().any(|(_, t)| *t == Trend::Declined));
            return if declining {
                vec![]
            } else {
                vec![Suggestion::TryNewChallenge]
            };
        }

        findings.sort_by(|a, b| {
            b.impact
                .total_cmp(&a.impact)
                .then_with(|| a.metric.cmp(&b.metric))
        });
        findings.into_iter().map(|f| f.suggestion).collect()
    }
}
