//! Daily log persistence with file locking.
//!
//! One entry per calendar date; saving a date replaces whatever was there
//! (last writer wins). Scoring the day is someone else's job: this module only
//! keeps what the workout engine contributes.

use crate::summary::DayContribution;
use crate::{Error, Result, RoutineSelection};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Workout-related facts for one day
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DayEntry {
    #[serde(default)]
    pub workout_done: bool,
    #[serde(default)]
    pub side_quests: BTreeSet<String>,
    #[serde(default)]
    pub reps: BTreeMap<String, u32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DayEntry {
    /// Fold a finished session into this day
    pub fn fold(&mut self, contribution: &DayContribution, at: DateTime<Utc>) {
        if contribution.workout_completed {
            match contribution.selection {
                RoutineSelection::Base => self.workout_done = true,
                RoutineSelection::SideQuest(quest) => {
                    self.side_quests.insert(quest.key().to_string());
                }
            }
        }
        for (exercise, reps) in &contribution.reps {
            let total = self.reps.entry(exercise.clone()).or_insert(0);
            *total = total.saturating_add(*reps);
        }
        self.updated_at = Some(at);
    }
}

enum Contents {
    Missing,
    Parsed(DailyLog),
    Corrupt(serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DailyLog {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DayEntry>,
}

impl DailyLog {
    /// Load the log with a shared lock
    ///
    /// Returns an empty log if the file doesn't exist. A file that can't be
    /// read or parsed is logged and treated as empty; it is left on disk
    /// untouched.
    pub fn load(path: &Path) -> Result<Self> {
        match Self::read_contents(path) {
            Ok(Contents::Missing) => {
                tracing::info!("No daily log found, starting empty");
                Ok(Self::default())
            }
            Ok(Contents::Parsed(log)) => {
                tracing::debug!("Loaded {} days from {:?}", log.days.len(), path);
                Ok(log)
            }
            Ok(Contents::Corrupt(e)) => {
                tracing::warn!("Failed to parse daily log {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("Unable to read daily log {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    fn read_contents(path: &Path) -> Result<Contents> {
        if !path.exists() {
            return Ok(Contents::Missing);
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(match serde_json::from_str::<DailyLog>(&contents) {
            Ok(log) => Contents::Parsed(log),
            Err(e) => Contents::Corrupt(e),
        })
    }

    /// Move an unparseable log aside as `<name>.corrupt-<timestamp>`
    fn quarantine(path: &Path) -> Result<PathBuf> {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
        let kept = path.with_file_name(name);
        std::fs::rename(path, &kept)?;
        Ok(kept)
    }

    /// Save atomically: temp file in the same directory, fsync, rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("daily log path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved daily log to {:?}", path);
        Ok(())
    }

    /// Load, modify and save back
    ///
    /// Unlike [`load`](Self::load), a log that exists but can't be read is an
    /// error, and one that can't be parsed is moved aside before the new log
    /// is written, so earlier days are never silently overwritten.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut DailyLog) -> Result<()>,
    {
        let mut log = match Self::read_contents(path)? {
            Contents::Missing => Self::default(),
            Contents::Parsed(log) => log,
            Contents::Corrupt(e) => {
                let kept = Self::quarantine(path)?;
                tracing::warn!(
                    "Daily log {:?} is unreadable ({}); kept it as {:?} and started a new one",
                    path,
                    e,
                    kept
                );
                Self::default()
            }
        };
        f(&mut log)?;
        log.save(path)?;
        Ok(log)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayEntry> {
        self.days.get(&date)
    }

    /// Replace a whole day
    pub fn save_day(&mut self, date: NaiveDate, entry: DayEntry) {
        self.days.insert(date, entry);
    }

    /// Fold a finished session into `date`'s entry
    pub fn record_session(
        &mut self,
        date: NaiveDate,
        contribution: &DayContribution,
        at: DateTime<Utc>,
    ) {
        self.days.entry(date).or_default().fold(contribution, at);
        tracing::info!("Recorded {} session for {}", contribution.selection, date);
    }

    /// Most recent date the base routine was completed
    pub fn last_workout_date(&self) -> Option<NaiveDate> {
        self.days
            .iter()
            .rev()
            .find(|(_, entry)| entry.workout_done)
            .map(|(date, _)| *date)
    }
}
