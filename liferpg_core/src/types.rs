//! Core domain types for the Life RPG workout engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and the catalog that holds them
//! - Segments and queues (what a session executes)
//! - Routine selections (base routine and side quests)
//! - Rep records and target recommendations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// A catalog entry describing one exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub name: String,
    pub demo_url: Option<String>,
    pub target_muscles: String,
    pub form_tip: String,
}

impl Exercise {
    /// Generic stand-in for a name the catalog doesn't know
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            demo_url: None,
            target_muscles: String::new(),
            form_tip: String::new(),
        }
    }
}

/// The complete catalog of exercises, keyed by name
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: HashMap<String, Exercise>,
}

// ============================================================================
// Segment and Queue Types
// ============================================================================

/// One timed exercise slot within a queue
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub exercise: String,
    pub duration_seconds: u32,
}

/// Ordered sequence of segments making up one session
///
/// Built fresh per session and never mutated once the session starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Queue {
    segments: Vec<Segment>,
}

impl Queue {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Sum of planned durations, before any fast-forward substitution
    pub fn planned_seconds(&self) -> u32 {
        self.segments.iter().map(|s| s.duration_seconds).sum()
    }
}

// ============================================================================
// Routine Selection Types
// ============================================================================

/// Optional single-set routines offered next to the base routine
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SideQuest {
    SwimPrep,
    Calisthenics,
    Abs,
}

impl SideQuest {
    pub const ALL: [SideQuest; 3] = [SideQuest::SwimPrep, SideQuest::Calisthenics, SideQuest::Abs];

    pub fn key(&self) -> &'static str {
        match self {
            SideQuest::SwimPrep => "swim-prep",
            SideQuest::Calisthenics => "calisthenics",
            SideQuest::Abs => "abs",
        }
    }
}

/// What the user picked in the `Selecting` stage
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RoutineSelection {
    Base,
    SideQuest(SideQuest),
}

impl RoutineSelection {
    /// Every selectable routine, base first
    pub fn all() -> Vec<RoutineSelection> {
        std::iter::once(RoutineSelection::Base)
            .chain(SideQuest::ALL.iter().copied().map(RoutineSelection::SideQuest))
            .collect()
    }

    pub fn key(&self) -> &'static str {
        match self {
            RoutineSelection::Base => "base",
            RoutineSelection::SideQuest(quest) => quest.key(),
        }
    }
}

impl fmt::Display for RoutineSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RoutineSelection {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "base" => Ok(RoutineSelection::Base),
            "swim-prep" | "swim" => Ok(RoutineSelection::SideQuest(SideQuest::SwimPrep)),
            "calisthenics" => Ok(RoutineSelection::SideQuest(SideQuest::Calisthenics)),
            "abs" => Ok(RoutineSelection::SideQuest(SideQuest::Abs)),
            _ => Err(crate::Error::InvalidSelection(s.to_string())),
        }
    }
}

// ============================================================================
// Rep History Types
// ============================================================================

/// One logged set: how many reps of which exercise, and when
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RepRecord {
    pub id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub exercise: String,
    pub reps: u32,
}

impl RepRecord {
    pub fn new(exercise: impl Into<String>, reps: u32, performed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            performed_at,
            exercise: exercise.into(),
            reps,
        }
    }
}

/// Recommended rep count shown before a segment and pre-filled at feedback
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetReps {
    /// Derived from recent history
    Reps { reps: u32 },
    /// No history yet
    Beginner { low: u32, high: u32 },
}

impl TargetReps {
    /// Value used to pre-fill the feedback prompt
    pub fn prefill(&self) -> u32 {
        match self {
            TargetReps::Reps { reps } => *reps,
            TargetReps::Beginner { low, .. } => *low,
        }
    }

    /// Value session totals are compared against in the summary
    pub fn ceiling(&self) -> u32 {
        match self {
            TargetReps::Reps { reps } => *reps,
            TargetReps::Beginner { high, .. } => *high,
        }
    }
}

impl fmt::Display for TargetReps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetReps::Reps { reps } => write!(f, "{} reps", reps),
            TargetReps::Beginner { low, high } => write!(f, "{}-{} reps", low, high),
        }
    }
}
