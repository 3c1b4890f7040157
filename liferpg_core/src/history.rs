//! Rep history store and target recommendation.
//!
//! History is append-only. The file-backed store writes to the JSONL WAL and
//! reads back from both the WAL and the CSV archive, de-duplicating by record
//! id, newest first.

use crate::config::TargetConfig;
use crate::csv_rollup::CsvRow;
use crate::wal::{JsonlSink, RepSink};
use crate::{RepRecord, Result, TargetReps};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Durable, append-only record of performed sets
pub trait RepStore {
    fn append(&mut self, record: &RepRecord) -> Result<()>;

    /// Up to `limit` records for `exercise`, newest first
    fn recent_records(&self, exercise: &str, limit: usize) -> Result<Vec<RepRecord>>;
}

/// In-memory store, used by tests and dry runs
#[derive(Clone, Debug, Default)]
pub struct MemoryRepStore {
    records: Vec<RepRecord>,
}

impl MemoryRepStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RepRecord] {
        &self.records
    }
}

impl RepStore for MemoryRepStore {
    fn append(&mut self, record: &RepRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn recent_records(&self, exercise: &str, limit: usize) -> Result<Vec<RepRecord>> {
        Ok(newest_for(self.records.iter().cloned(), exercise, limit))
    }
}

/// Store backed by the rep WAL plus its CSV archive
pub struct FileRepStore {
    sink: JsonlSink,
    csv_path: PathBuf,
}

impl FileRepStore {
    pub fn new(wal_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            sink: JsonlSink::new(wal_path),
            csv_path: csv_path.into(),
        }
    }
}

impl RepStore for FileRepStore {
    fn append(&mut self, record: &RepRecord) -> Result<()> {
        self.sink.append(record)
    }

    fn recent_records(&self, exercise: &str, limit: usize) -> Result<Vec<RepRecord>> {
        let records = load_records(self.sink.path(), &self.csv_path)?;
        Ok(newest_for(records.into_iter(), exercise, limit))
    }
}

fn newest_for(
    records: impl Iterator<Item = RepRecord>,
    exercise: &str,
    limit: usize,
) -> Vec<RepRecord> {
    let mut matching: Vec<_> = records.filter(|r| r.exercise == exercise).collect();
    matching.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    matching.truncate(limit);
    matching
}

impl TryFrom<CsvRow> for RepRecord {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let performed_at = DateTime::parse_from_rfc3339(&row.performed_at)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        Ok(RepRecord {
            id,
            performed_at,
            exercise: row.exercise,
            reps: row.reps,
        })
    }
}

/// Load every record from the WAL and the CSV archive
///
/// Returns records sorted by `performed_at`, newest first. A record present in
/// both files (rollup interrupted before the WAL was truncated) appears once.
pub fn load_records(wal_path: &Path, csv_path: &Path) -> Result<Vec<RepRecord>> {
    let mut records = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for record in crate::wal::read_records(wal_path)? {
            if seen_ids.insert(record.id) {
                records.push(record);
            }
        }
        tracing::debug!("Loaded {} rep records from WAL", records.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for record in load_records_from_csv(csv_path)? {
            if seen_ids.insert(record.id) {
                records.push(record);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} rep records from CSV", csv_count);
    }

    records.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    Ok(records)
}

fn load_records_from_csv(path: &Path) -> Result<Vec<RepRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut records = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match RepRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Failed to parse CSV row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(records)
}

/// Recommend a target from records already ordered newest first
///
/// Averages up to `window` records and adds `increment`; with no history the
/// beginner range is returned.
pub fn recommend(recent: &[RepRecord], config: &TargetConfig) -> TargetReps {
    let window = &recent[..recent.len().min(config.window)];
    if window.is_empty() {
        return TargetReps::Beginner {
            low: config.beginner_low,
            high: config.beginner_high,
        };
    }

    let total: u64 = window.iter().map(|r| u64::from(r.reps)).sum();
    let average = total as f64 / window.len() as f64;
    // The average of u32 values fits in u32; `as` saturates anyway
    TargetReps::Reps {
        reps: (average.round() as u32).saturating_add(config.increment),
    }
}

/// Current target for `exercise`
///
/// An unreadable store is treated like an empty one: the target is guidance
/// only and must never block a session.
pub fn target_reps<S: RepStore + ?Sized>(
    store: &S,
    exercise: &str,
    config: &TargetConfig,
) -> TargetReps {
    match store.recent_records(exercise, config.window) {
        Ok(recent) => recommend(&recent, config),
        Err(e) => {
            tracing::warn!(
                "Unable to read rep history for '{}': {}. Using beginner target.",
                exercise,
                e
            );
            recommend(&[], config)
        }
    }
}
