use std::{cell::RefCell, collections::HashMap, future::Future};

use popstat_metrics::SessionRecord;

/// Failure reported by a [`Storage`] backend.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("storage error: {message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    /// Wraps a backend-specific failure message.
    pub fn new<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Indexed record fields a [`RecordQuery`] may range over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedField {
    StartTime,
    EndTime,
}

/// Inclusive range filter on an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordQuery {
    pub index: IndexedField,
    pub lower: i64,
    pub upper: i64,
}

impl RecordQuery {
    /// Sessions starting within `lower..=upper`, epoch milliseconds.
    #[must_use]
    pub const fn start_time_between(lower: i64, upper: i64) -> Self {
        Self {
            index: IndexedField::StartTime,
            lower,
            upper,
        }
    }

    /// Whether `record` falls inside the range.
    #[must_use]
    pub fn matches(&self, record: &SessionRecord) -> bool {
        let value = match self.index {
            IndexedField::StartTime => record.start_time,
            IndexedField::EndTime => record.end_time,
        };
        (self.lower..=self.upper).contains(&value)
    }
}

/// Read access to the persistent session store.
///
/// Implementations must return an empty vector, not an error, when nothing
/// matches the query. The returned future is polled on the caller's thread.
pub trait Storage {
    /// Records of `store_name` matching `query`, or all of them without one.
    fn get_data(
        &self,
        store_name: &str,
        query: Option<&RecordQuery>,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, StorageError>>;
}

/// In-process [`Storage`] keyed by store name.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RefCell<HashMap<String, Vec<SessionRecord>>>,
}

impl MemoryStorage {
    /// Storage with no stores; every read returns nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records<N>(store_name: N, records: Vec<SessionRecord>) -> Self
    where
        N: Into<String>,
    {
        let storage = Self::new();
        storage.set_records(store_name, records);
        storage
    }

    /// Replaces the contents of `store_name`.
    pub fn set_records<N>(&self, store_name: N, records: Vec<SessionRecord>)
    where
        N: Into<String>,
    {
        self.stores.borrow_mut().insert(store_name.into(), records);
    }
}

impl Storage for MemoryStorage {
    async fn get_data(
        &self,
        store_name: &str,
        query: Option<&RecordQuery>,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let stores = self.stores.borrow();
        let Some(records) = stores.get(store_name) else {
            return Ok(vec![]);
        };
        Ok(records
            .iter()
            .filter(|record| query.is_none_or(|q| q.matches(record)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    fn record(id: &str, start_time: i64) -> SessionRecord {
        SessionRecord {
            session_id: id.to_owned(),
            player_id: None,
            stage_id: None,
            start_time,
            end_time: start_time + 1000,
            final_score: 0,
            bubbles_popped: 0,
            bubbles_missed: 0,
            max_combo: 0,
            completed: false,
        }
    }

    #[test]
    fn test_unknown_store_is_empty() {
        let storage = MemoryStorage::new();
        let records = block_on(storage.get_data("sessions", None)).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_range_query_is_inclusive() {
        let storage = MemoryStorage::with_records(
            "sessions",
            vec![record("a", 100), record("b", 200), record("c", 300)],
        );
        let query = RecordQuery::start_time_between(100, 200);
        let ids = block_on(storage.get_data("sessions", Some(&query)))
            .unwrap()
            .into_iter()
            .map(|r| r.session_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let storage = MemoryStorage::with_records("sessions", vec![record("a", 100)]);
        let query = RecordQuery::start_time_between(500, 900);
        assert_eq!(block_on(storage.get_data("sessions", Some(&query))), Ok(vec![]));
    }
}
