use std::string::FromUtf8Error;

use serde::{Deserialize, Serialize};

use crate::{
    AllStatistics, ErrorSample, FpsSample, LoadTimeSample, Measurement, MemorySample, Recorded,
};

pub const CSV_HEADER: [&str; 4] = ["Type", "Timestamp", "Value", "Details"];

#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::FromStr,
)]
pub enum ExportFormat {
    #[default]
    #[display("json")]
    Json,
    #[display("csv")]
    Csv,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ExportError {
    #[display("failed to write CSV: {_0}")]
    Csv(csv::Error),
    #[display("failed to serialize JSON: {_0}")]
    Json(serde_json::Error),
    #[display("failed to flush CSV: {_0}")]
    Io(std::io::Error),
    #[display("export is not valid UTF-8: {_0}")]
    Utf8(FromUtf8Error),
}

/// Every buffered sample, oldest first within each class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawData {
    pub fps: Vec<Recorded<FpsSample>>,
    pub memory: Vec<Recorded<MemorySample>>,
    pub load_times: Vec<Recorded<LoadTimeSample>>,
    pub errors: Vec<Recorded<ErrorSample>>,
    pub measurements: Vec<Measurement>,
}

/// Applied to raw data before it leaves the process.
pub trait Privacy {
    fn anonymize_data(&self, data: RawData) -> RawData;

    fn anonymize_session_id(&self, session_id: &str) -> String {
        session_id.to_owned()
    }
}

/// Leaves data untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrivacy;

impl Privacy for NoPrivacy {
    fn anonymize_data(&self, data: RawData) -> RawData {
        data
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub session_id: String,
    pub exported_at: i64,
    pub statistics: AllStatistics,
    pub raw_data: RawData,
}

impl ExportDocument {
    pub fn render(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Csv => self.raw_data.to_csv(),
        }
    }
}

impl RawData {
    /// One row per sample under [`CSV_HEADER`].
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(CSV_HEADER)?;
        for r in &self.fps {
            let s = &r.sample;
            writer.write_record([
                "FPS".to_owned(),
                s.timestamp.to_string(),
                s.fps.to_string(),
                format!("frameTime={:.2}", s.frame_time),
            ])?;
        }
        for r in &self.memory {
            let s = &r.sample;
            writer.write_record([
                "Memory".to_owned(),
                s.timestamp.to_string(),
                format!("{:.2}", s.usage_percent),
                format!("used={};total={};limit={}", s.used, s.total, s.limit),
            ])?;
        }
        for r in &self.load_times {
            let s = &r.sample;
            writer.write_record([
                "LoadTime".to_owned(),
                s.timestamp.to_string(),
                s.load_complete.to_string(),
                format!("domContentLoaded={}", s.dom_content_loaded),
            ])?;
        }
        for r in &self.errors {
            let s = &r.sample;
            writer.write_record([
                "Error".to_owned(),
                s.timestamp.to_string(),
                s.kind.clone(),
                s.message.clone(),
            ])?;
        }
        for m in &self.measurements {
            writer.write_record([
                "Measure".to_owned(),
                m.start_time.to_string(),
                m.duration.to_string(),
                m.name.clone(),
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }
}
