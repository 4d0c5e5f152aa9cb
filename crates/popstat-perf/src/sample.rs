use serde::{Deserialize, Serialize};

/// A sample stored by the aggregator, tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recorded<T> {
    pub session_id: String,
    #[serde(flatten)]
    pub sample: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsSample {
    pub timestamp: i64,
    pub fps: f64,
    /// Milliseconds per frame.
    #[serde(default)]
    pub frame_time: f64,
}

impl FpsSample {
    #[must_use]
    pub fn new(timestamp: i64, fps: f64) -> Self {
        let frame_time = if fps > 0.0 { 1000.0 / fps } else { 0.0 };
        Self {
            timestamp,
            fps,
            frame_time,
        }
    }
}

/// Heap usage in bytes as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReading {
    pub used: u64,
    pub total: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySample {
    pub timestamp: i64,
    pub used: u64,
    pub total: u64,
    pub limit: u64,
    /// `used / limit` as a percentage, `0` when the limit is unknown.
    pub usage_percent: f64,
}

impl MemorySample {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(timestamp: i64, reading: MemoryReading) -> Self {
        let usage_percent = if reading.limit == 0 {
            0.0
        } else {
            reading.used as f64 / reading.limit as f64 * 100.0
        };
        Self {
            timestamp,
            used: reading.used,
            total: reading.total,
            limit: reading.limit,
            usage_percent,
        }
    }
}

/// Page load milestones in milliseconds since navigation start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTimeSample {
    pub timestamp: i64,
    pub dom_content_loaded: f64,
    pub load_complete: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSample {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorSample {
    pub fn new<K, M>(timestamp: i64, kind: K, message: M) -> Self
    where
        K: Into<String>,
        M: Into<String>,
    {
        Self {
            timestamp,
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// One line of a recorded performance log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PerformanceEvent {
    Fps(FpsSample),
    Memory(MemorySample),
    LoadTime(LoadTimeSample),
    Error(ErrorSample),
}

/// A performance log as written by the game client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceLog {
    pub session_id: String,
    pub events: Vec<PerformanceEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time() {
        assert_eq!(FpsSample::new(0, 50.0).frame_time, 20.0);
        assert_eq!(FpsSample::new(0, 0.0).frame_time, 0.0);
    }

    #[test]
    fn test_memory_usage_percent() {
        let reading = MemoryReading {
            used: 40,
            total: 60,
            limit: 200,
        };
        assert_eq!(MemorySample::new(0, reading).usage_percent, 20.0);

        let unknown = MemoryReading { limit: 0, ..reading };
        assert_eq!(MemorySample::new(0, unknown).usage_percent, 0.0);
    }

    #[test]
    fn test_deserialize_log() {
        let json = r#"{
            "sessionId": "s1",
            "events": [
                {"kind": "fps", "timestamp": 1, "fps": 58.5},
                {"kind": "memory", "timestamp": 2, "used": 1, "total": 2, "limit": 4, "usagePercent": 25.0},
                {"kind": "loadTime", "timestamp": 3, "domContentLoaded": 800.0, "loadComplete": 1200.0},
                {"kind": "error", "timestamp": 4, "type": "TypeError", "message": "x is undefined"}
            ]
        }"#;
        let log: PerformanceLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.session_id, "s1");
        assert_eq!(log.events.len(), 4);
        assert!(matches!(&log.events[3], PerformanceEvent::Error(e) if e.kind == "TypeError"));
    }
}
