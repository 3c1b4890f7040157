//! CSV rollup for archiving the rep WAL.
//!
//! The rollup holds the WAL's exclusive lock from read to truncate, so a
//! session appending at the same time waits and then writes into the emptied
//! WAL. Records are fsynced to the CSV before the WAL is truncated; a crash in
//! between leaves duplicates (filtered on read by id) rather than losing sets.

use crate::{RepRecord, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Seek, SeekFrom};
use std::path::Path;

/// A row in the CSV archive
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub performed_at: String,
    pub exercise: String,
    pub reps: u32,
}

impl From<&RepRecord> for CsvRow {
    fn from(record: &RepRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            performed_at: record.performed_at.to_rfc3339(),
            exercise: record.exercise.clone(),
            reps: record.reps,
        }
    }
}

/// Roll up WAL records into CSV and archive the WAL
///
/// 1. Locks the WAL and reads all records from it
/// 2. Appends them to the CSV file (header only when the file is new)
/// 3. Syncs the CSV to disk
/// 4. Copies the WAL to `.wal.processed` and truncates it
///
/// Returns the number of records processed. A missing WAL counts as empty.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let wal = match OpenOptions::new().read(true).write(true).open(wal_path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    wal.lock_exclusive()?;
    let result = roll_up_locked(&wal, wal_path, csv_path);
    wal.unlock()?;
    result
}

fn roll_up_locked(mut wal: &File, wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = crate::wal::parse_records(BufReader::new(wal))?;

    if records.is_empty() {
        tracing::info!("No rep records in WAL to roll up");
        return Ok(0);
    }

    append_to_csv(&records, csv_path)?;
    tracing::info!("Wrote {} rep records to CSV", records.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::copy(wal_path, &processed_path)?;
    wal.set_len(0)?;
    wal.seek(SeekFrom::Start(0))?;
    wal.sync_all()?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(records.len())
}

fn append_to_csv(records: &[RepRecord], csv_path: &Path) -> Result<()> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;
    Ok(())
}

/// Remove all `.processed` WAL files in `dir`
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{JsonlSink, RepSink};
    use chrono::Utc;
    use std::fs::File;

    #[test]
    fn test_wal_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("reps.wal");
        let csv_path = temp_dir.path().join("reps.csv");

        let mut sink = JsonlSink::new(&wal_path);
        for reps in [10, 11, 12] {
            sink.append(&RepRecord::new("Goblet Squats", reps, Utc::now()))
                .unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);
        assert!(wal_path.with_extension("wal.processed").exists());

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with("id,performed_at,exercise,reps"));
    }

    #[test]
    fn test_wal_to_csv_appends_without_second_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("reps.wal");
        let csv_path = temp_dir.path().join("reps.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&RepRecord::new("Dips", 8, Utc::now())).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        sink.append(&RepRecord::new("Dips", 9, Utc::now())).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("reps.csv");

        File::create(&wal_path).unwrap();

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_missing_wal_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("missing.wal");
        let csv_path = temp_dir.path().join("reps.csv");

        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 0);
        assert!(!wal_path.exists());
    }

    #[test]
    fn test_appends_after_rollup_land_in_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("reps.wal");
        let csv_path = temp_dir.path().join("reps.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&RepRecord::new("Dips", 8, Utc::now())).unwrap();
        wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        sink.append(&RepRecord::new("Dips", 10, Utc::now())).unwrap();
        let pending = crate::wal::read_records(&wal_path).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reps, 10);
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("a.wal.processed")).unwrap();
        File::create(temp_dir.path().join("b.wal.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        let count = cleanup_processed_wals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
