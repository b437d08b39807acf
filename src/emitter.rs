//! NDJSON Emitter
//!
//! Writes records as one JSON object per line (no enclosing array).
//! The output file is truncated and rewritten on every run.
//!
//! All records are serialized before the file is opened, so a serialization
//! failure leaves any previous output untouched.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct NdjsonWriter {
    path: PathBuf,
}

impl NdjsonWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize every record, then truncate and rewrite the output file.
    /// Returns the number of lines written.
    pub fn write_all<T: Serialize>(&self, records: &[T]) -> Result<usize> {
        let lines = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to serialize record to JSON")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to open output file: {:?}", self.path))?;
        let mut writer = BufWriter::new(file);

        for line in &lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;

        info!("Wrote {} records to {}", lines.len(), self.path.display());
        Ok(lines.len())
    }

    /// Read every non-empty line back as a JSON value
    pub fn read_values(&self) -> Result<Vec<Value>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open output file: {:?}", self.path))?;
        let reader = BufReader::new(file);

        let mut values = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                let value: Value = serde_json::from_str(&line)
                    .with_context(|| format!("Failed to parse JSON line: {}", line))?;
                values.push(value);
            }
        }

        Ok(values)
    }
}
