use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context as _;
use popstat_metrics::SessionCollection;
use serde::{Serialize, de::DeserializeOwned};

/// Where a command writes its result: a file when `--output` is given,
/// stdout otherwise.
pub struct Output {
    writer: Box<dyn Write>,
    name: String,
}

impl Output {
    pub fn create(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                writer: Box::new(io::stdout().lock()),
                name: "stdout".to_owned(),
            });
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self {
            writer: Box::new(BufWriter::new(file)),
            name: path.display().to_string(),
        })
    }

    pub fn save_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut output = Self::create(path)?;
        serde_json::to_writer_pretty(&mut output.writer, value)
            .with_context(|| format!("Failed to write JSON to {}", output.name))?;
        output.finish(true)
    }

    pub fn save_text(text: &str, path: Option<&Path>) -> anyhow::Result<()> {
        let mut output = Self::create(path)?;
        output
            .writer
            .write_all(text.as_bytes())
            .with_context(|| format!("Failed to write to {}", output.name))?;
        output.finish(!text.ends_with('\n'))
    }

    fn finish(mut self, newline: bool) -> anyhow::Result<()> {
        if newline {
            writeln!(self.writer).with_context(|| format!("Failed to write to {}", self.name))?;
        }
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush output to {}", self.name))
    }
}

pub fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} file: {}", path.display()))
}

/// Reads an optional JSON config file, falling back to defaults.
pub fn read_config_file<T>(path: Option<&Path>) -> anyhow::Result<T>
where
    T: DeserializeOwned + Default,
{
    path.map_or_else(|| Ok(T::default()), |path| read_json_file("config", path))
}

pub fn read_sessions_file(path: &Path) -> anyhow::Result<SessionCollection> {
    read_json_file("sessions", path)
}
