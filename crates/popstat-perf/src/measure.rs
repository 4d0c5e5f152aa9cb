use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ring_buffer::RingBuffer;

/// A named duration between a start and an end mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub name: String,
    pub start_time: i64,
    /// Milliseconds.
    pub duration: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct Measurements {
    marks: HashMap<String, i64>,
    finished: RingBuffer<Measurement>,
}

impl Measurements {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            marks: HashMap::new(),
            finished: RingBuffer::with_capacity(capacity),
        }
    }

    /// Starting a name that is already open restarts it.
    pub(crate) fn start(&mut self, name: &str, now: i64) {
        self.marks.insert(name.to_owned(), now);
    }

    pub(crate) fn end(&mut self, name: &str, now: i64) -> Option<Measurement> {
        let start_time = self.marks.remove(name)?;
        let measurement = Measurement {
            name: name.to_owned(),
            start_time,
            duration: now.saturating_sub(start_time).max(0),
        };
        self.finished.push(measurement.clone());
        Some(measurement)
    }

    pub(crate) fn finished(&self) -> impl Iterator<Item = &Measurement> {
        self.finished.iter()
    }

    pub(crate) fn to_vec(&self) -> Vec<Measurement> {
        self.finished.to_vec()
    }

    pub(crate) fn clear(&mut self) {
        self.marks.clear();
        self.finished.clear();
    }
}
