#![forbid(unsafe_code)]

//! Guided workout session engine for the Life RPG tracker.
//!
//! This crate provides:
//! - Domain types (exercises, segments, queues, rep records)
//! - Exercise catalog and routine definitions
//! - Session state machine with countdown timing
//! - Rep history (WAL, CSV archive) and target recommendation
//! - Session summary and daily-log fold-in

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod routine;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod session;
pub mod summary;
pub mod daylog;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use wal::{JsonlSink, RepSink};
pub use history::{FileRepStore, MemoryRepStore, RepStore};
pub use session::{SessionState, Stage};
pub use summary::{DayContribution, SessionSummary};
pub use daylog::DailyLog;
pub use engine::{parse_reps, FeedbackOutcome, SegmentPreview, UpNext, WorkoutEngine};
