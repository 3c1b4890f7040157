//! Write-Ahead Log (WAL) for rep records.
//!
//! Each confirmed set is appended to a JSONL (JSON Lines) file under an
//! exclusive file lock, so a rollup running in another process never sees a
//! half-written line.

use crate::{RepRecord, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only destination for rep records
pub trait RepSink {
    fn append(&mut self, record: &RepRecord) -> Result<()>;
}

/// JSONL-based rep sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl RepSink for JsonlSink {
    fn append(&mut self, record: &RepRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Appended {} x {} ({}) to WAL",
            record.reps,
            record.exercise,
            record.id
        );
        Ok(())
    }
}

/// Read all rep records from a WAL file
///
/// Lines that fail to parse are skipped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<RepRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let records = parse_records(BufReader::new(&file));
    file.unlock()?;

    let records = records?;
    tracing::debug!("Read {} rep records from WAL", records.len());
    Ok(records)
}

/// Parse JSONL rep records from an already-locked reader
pub(crate) fn parse_records(reader: impl BufRead) -> Result<Vec<RepRecord>> {
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<RepRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse rep record at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(records)
}
