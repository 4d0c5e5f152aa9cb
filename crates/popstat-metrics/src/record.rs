use serde::{Deserialize, Serialize};

use crate::InvalidRecordError;

/// One recorded play session.
///
/// Records are produced by the game client's collector and owned by the
/// storage layer; this crate only reads them. Timestamps are epoch
/// milliseconds. Counters the collector did not report deserialize as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub final_score: u64,
    #[serde(default)]
    pub bubbles_popped: u64,
    #[serde(default)]
    pub bubbles_missed: u64,
    #[serde(default)]
    pub max_combo: u64,
    #[serde(default)]
    pub completed: bool,
}

impl SessionRecord {
    /// Checks the structural invariants every record must satisfy.
    pub fn validate(&self) -> Result<(), InvalidRecordError> {
        if self.session_id.is_empty() {
            return Err(InvalidRecordError::EmptySessionId);
        }
        if self.end_time < self.start_time {
            return Err(InvalidRecordError::EndBeforeStart {
                session_id: self.session_id.clone(),
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        Ok(())
    }

    /// Returns the player id, failing for anonymous sessions.
    pub fn require_player_id(&self) -> Result<&str, InvalidRecordError> {
        self.player_id
            .as_deref()
            .ok_or_else(|| InvalidRecordError::MissingPlayerId {
                session_id: self.session_id.clone(),
            })
    }

    /// Session length in milliseconds (never negative for a valid record).
    #[must_use]
    pub fn duration_millis(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Total number of pop attempts.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.bubbles_popped.saturating_add(self.bubbles_missed)
    }
}

/// A batch of session records as exported by the collector.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionCollection {
    pub sessions: Vec<SessionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            session_id: "s1".to_owned(),
            player_id: None,
            stage_id: None,
            start_time: 1000,
            end_time: 301_000,
            final_score: 1000,
            bubbles_popped: 80,
            bubbles_missed: 20,
            max_combo: 15,
            completed: true,
        }
    }

    #[test]
    fn test_deserialize_camel_case_with_missing_counters() {
        let json = r#"{"sessionId":"s9","startTime":1000,"endTime":2000,"finalScore":500}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.session_id, "s9");
        assert_eq!(record.bubbles_popped, 0);
        assert_eq!(record.player_id, None);
        assert!(!record.completed);
    }

    #[test]
    fn test_negative_count_is_rejected_by_deserialization() {
        let json = r#"{"sessionId":"s9","startTime":0,"endTime":1,"finalScore":5,"bubblesPopped":-1}"#;
        assert!(serde_json::from_str::<SessionRecord>(json).is_err());
    }

    #[test]
    fn test_validate() {
        assert_eq!(record().validate(), Ok(()));

        let mut empty_id = record();
        empty_id.session_id.clear();
        assert_eq!(empty_id.validate(), Err(InvalidRecordError::EmptySessionId));

        let mut reversed = record();
        reversed.end_time = 0;
        assert!(matches!(
            reversed.validate(),
            Err(InvalidRecordError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_require_player_id() {
        let mut r = record();
        assert!(r.require_player_id().is_err());
        r.player_id = Some("p1".to_owned());
        assert_eq!(r.require_player_id(), Ok("p1"));
    }
}
