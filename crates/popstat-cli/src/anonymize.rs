use std::{cell::RefCell, collections::HashMap};

use popstat_perf::{Privacy, RawData};

/// Replaces session ids with `session_N`, numbered by first appearance.
///
/// Error messages are dropped since they may quote user content.
#[derive(Debug, Default)]
pub struct SessionAnonymizer {
    aliases: RefCell<HashMap<String, String>>,
}

impl SessionAnonymizer {
    fn alias(&self, session_id: &str) -> String {
        let mut aliases = self.aliases.borrow_mut();
        let next = aliases.len() + 1;
        aliases
            .entry(session_id.to_owned())
            .or_insert_with(|| format!("session_{next}"))
            .clone()
    }
}

impl Privacy for SessionAnonymizer {
    fn anonymize_data(&self, mut data: RawData) -> RawData {
        for r in &mut data.fps {
            r.session_id = self.alias(&r.session_id);
        }
        for r in &mut data.memory {
            r.session_id = self.alias(&r.session_id);
        }
        for r in &mut data.load_times {
            r.session_id = self.alias(&r.session_id);
        }
        for r in &mut data.errors {
            r.session_id = self.alias(&r.session_id);
            r.sample.message.clear();
        }
        data
    }

    fn anonymize_session_id(&self, session_id: &str) -> String {
        self.alias(session_id)
    }
}

#[cfg(test)]
mod tests {
    use popstat_perf::{ErrorSample, FpsSample, Recorded};

    use super::*;

    fn recorded<T>(session_id: &str, sample: T) -> Recorded<T> {
        Recorded {
            session_id: session_id.to_owned(),
            sample,
        }
    }

    #[test]
    fn test_aliases_are_stable() {
        let anonymizer = SessionAnonymizer::default();
        assert_eq!(anonymizer.anonymize_session_id("abc"), "session_1");
        assert_eq!(anonymizer.anonymize_session_id("xyz"), "session_2");
        assert_eq!(anonymizer.anonymize_session_id("abc"), "session_1");
    }

    #[test]
    fn test_raw_data_is_rewritten() {
        let anonymizer = SessionAnonymizer::default();
        let data = RawData {
            fps: vec![recorded("real-id", FpsSample::new(1, 60.0))],
            errors: vec![recorded(
                "real-id",
                ErrorSample::new(2, "TypeError", "user@example.com"),
            )],
            ..RawData::default()
        };
        let data = anonymizer.anonymize_data(data);
        assert_eq!(data.fps[0].session_id, "session_1");
        assert_eq!(data.errors[0].session_id, "session_1");
        assert_eq!(data.errors[0].sample.kind, "TypeError");
        assert!(data.errors[0].sample.message.is_empty());
    }
}
