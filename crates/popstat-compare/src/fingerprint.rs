use std::fmt;

use serde::{Deserialize, Serialize};

/// What a comparison measures the target against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonKind {
    #[display("past")]
    Past,
    #[display("benchmark")]
    Benchmark,
    #[display("stage")]
    Stage,
}

/// Fully resolved comparison parameters.
///
/// Values are normalized against the engine configuration before they get
/// here, so two requests that would compute the same result compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonParams {
    Past {
        window_size: usize,
    },
    Benchmark {
        recency_window_days: u32,
    },
    Stage {
        stage_id: String,
        session_count: usize,
    },
}

impl ComparisonParams {
    #[must_use]
    pub const fn kind(&self) -> ComparisonKind {
        match self {
            Self::Past { .. } => ComparisonKind::Past,
            Self::Benchmark { .. } => ComparisonKind::Benchmark,
            Self::Stage { .. } => ComparisonKind::Stage,
        }
    }
}

impl fmt::Display for ComparisonParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Past { window_size } => write!(f, "window={window_size}"),
            Self::Benchmark {
                recency_window_days,
            } => write!(f, "days={recency_window_days}"),
            Self::Stage {
                stage_id,
                session_count,
            } => write!(f, "stage={stage_id},count={session_count}"),
        }
    }
}

/// Cache and de-duplication key of a comparison request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{}:{target_id}:{params}", params.kind())]
pub struct Fingerprint {
    target_id: String,
    params: ComparisonParams,
}

impl Fingerprint {
    /// Keys the comparison of `target_id` under `params`.
    pub fn new<T>(target_id: T, params: ComparisonParams) -> Self
    where
        T: Into<String>,
    {
        Self {
            target_id: target_id.into(),
            params,
        }
    }

    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    #[must_use]
    pub fn params(&self) -> &ComparisonParams {
        &self.params
    }

    #[must_use]
    pub const fn kind(&self) -> ComparisonKind {
        self.params.kind()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_display() {
        let fp = Fingerprint::new("s1", ComparisonParams::Past { window_size: 10 });
        assert_eq!(fp.to_string(), "past:s1:window=10");

        let fp = Fingerprint::new(
            "s2",
            ComparisonParams::Stage {
                stage_id: "forest-3".to_owned(),
                session_count: 5,
            },
        );
        assert_eq!(fp.to_string(), "stage:s2:stage=forest-3,count=5");
    }

    #[test]
    fn test_equality_covers_kind_target_and_params() {
        let fps = [
            Fingerprint::new("s1", ComparisonParams::Past { window_size: 10 }),
            Fingerprint::new("s1", ComparisonParams::Past { window_size: 10 }),
            Fingerprint::new("s1", ComparisonParams::Past { window_size: 5 }),
            Fingerprint::new("s2", ComparisonParams::Past { window_size: 10 }),
            Fingerprint::new(
                "s1",
                ComparisonParams::Benchmark {
                    recency_window_days: 10,
                },
            ),
        ];
        let distinct = fps.iter().collect::<HashSet<_>>();
        assert_eq!(distinct.len(), 4);
    }
}
