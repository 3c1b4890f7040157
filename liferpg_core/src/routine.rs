//! Session queue builder.
//!
//! Routines are static, ordered lists of (exercise, planned seconds). The base
//! routine runs twice; side quests run once. Planned durations are copied
//! verbatim: fast-forward substitution happens when a countdown is armed, see
//! [`crate::config::SessionConfig::segment_seconds`].

use crate::{Error, Queue, Result, RoutineSelection, Segment, SideQuest};

pub type RoutineDefinition = &'static [(&'static str, u32)];

const BASE_ROUTINE: RoutineDefinition = &[
    ("Goblet Squats", 30),
    ("Dumbbell Rows", 30),
    ("Push-ups", 30),
    ("Overhead Press", 30),
    ("Reverse Lunges", 30),
    ("Plank", 30),
];

const BASE_ROUTINE_SETS: usize = 2;

const SWIM_PREP: RoutineDefinition = &[
    ("Arm Circles", 30),
    ("Flutter Kicks", 30),
    ("Superman Hold", 30),
    ("Streamline Squats", 30),
];

const CALISTHENICS: RoutineDefinition = &[
    ("Pull-ups", 40),
    ("Dips", 40),
    ("Pike Push-ups", 40),
    ("Bodyweight Squats", 40),
];

const ABS: RoutineDefinition = &[
    ("Crunches", 30),
    ("Leg Raises", 30),
    ("Russian Twists", 30),
    ("Mountain Climbers", 30),
    ("Plank", 45),
];

/// The ordered exercise list behind a selection (one set)
pub fn definition(selection: RoutineSelection) -> RoutineDefinition {
    match selection {
        RoutineSelection::Base => BASE_ROUTINE,
        RoutineSelection::SideQuest(SideQuest::SwimPrep) => SWIM_PREP,
        RoutineSelection::SideQuest(SideQuest::Calisthenics) => CALISTHENICS,
        RoutineSelection::SideQuest(SideQuest::Abs) => ABS,
    }
}

/// How many times the definition is repeated
pub fn sets(selection: RoutineSelection) -> usize {
    match selection {
        RoutineSelection::Base => BASE_ROUTINE_SETS,
        RoutineSelection::SideQuest(_) => 1,
    }
}

/// Build the queue for a selection
pub fn build(selection: RoutineSelection) -> Result<Queue> {
    let queue = build_from(definition(selection), sets(selection))?;
    tracing::info!(
        "Built queue for {}: {} segments, {}s planned",
        selection,
        queue.len(),
        queue.planned_seconds()
    );
    Ok(queue)
}

/// Build a queue by concatenating `definition` with itself `sets` times
///
/// A definition that yields no segments is a configuration defect, not
/// something a session can recover from.
pub fn build_from(definition: RoutineDefinition, sets: usize) -> Result<Queue> {
    let segments: Vec<Segment> = std::iter::repeat(definition)
        .take(sets)
        .flat_map(|def| def.iter())
        .map(|(exercise, seconds)| Segment {
            exercise: exercise.to_string(),
            duration_seconds: *seconds,
        })
        .collect();

    if segments.is_empty() {
        return Err(Error::Config(format!(
            "routine produced no segments ({} exercises x {} sets)",
            definition.len(),
            sets
        )));
    }

    Ok(Queue::new(segments))
}
