//! End-of-session evaluation.
//!
//! Read-only: targets are recomputed at summary time from the history store,
//! and nothing is written back.

use crate::config::TargetConfig;
use crate::{RoutineSelection, TargetReps};
use serde::Serialize;
use std::collections::BTreeMap;

/// How one exercise went this session
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ExerciseResult {
    pub exercise: String,
    pub session_reps: u32,
    pub target: TargetReps,
    pub personal_best: bool,
}

/// Outcome of a finished session
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub selection: RoutineSelection,
    pub results: Vec<ExerciseResult>,
    /// At least one exercise beat its target by more than twice the margin
    pub bonus: bool,
}

/// What a finished session contributes to the day's log
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DayContribution {
    pub selection: RoutineSelection,
    pub workout_completed: bool,
    pub reps: BTreeMap<String, u32>,
}

impl SessionSummary {
    pub fn personal_bests(&self) -> impl Iterator<Item = &ExerciseResult> {
        self.results.iter().filter(|r| r.personal_best)
    }

    pub fn day_contribution(&self) -> DayContribution {
        DayContribution {
            selection: self.selection,
            workout_completed: true,
            reps: self
                .results
                .iter()
                .map(|r| (r.exercise.clone(), r.session_reps))
                .collect(),
        }
    }
}

/// Compare session totals against freshly computed targets
pub fn evaluate<F>(
    selection: RoutineSelection,
    rep_log: &BTreeMap<String, u32>,
    config: &TargetConfig,
    mut target_for: F,
) -> SessionSummary
where
    F: FnMut(&str) -> TargetReps,
{
    let margin = config.personal_best_margin;
    let mut bonus = false;

    let results = rep_log
        .iter()
        .map(|(exercise, &session_reps)| {
            let target = target_for(exercise);
            let personal_best = session_reps > target.ceiling().saturating_add(margin);
            if session_reps > target.ceiling().saturating_add(margin.saturating_mul(2)) {
                bonus = true;
            }
            ExerciseResult {
                exercise: exercise.clone(),
                session_reps,
                target,
                personal_best,
            }
        })
        .collect::<Vec<_>>();

    tracing::info!(
        "Session summary: {} exercises, {} personal bests, bonus={}",
        results.len(),
        results.iter().filter(|r| r.personal_best).count(),
        bonus
    );

    SessionSummary {
        selection,
        results,
        bonus,
    }
}
