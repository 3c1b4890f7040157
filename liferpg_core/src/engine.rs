//! Workout engine: the session state machine wired to its collaborators.
//!
//! The engine owns the catalog reference, the rep history store and the
//! configuration. The [`SessionState`] stays with the caller and is passed in
//! explicitly. Pure transitions (start, pause, tick, ...) live on the state
//! itself; the engine adds the ones that need history or the catalog:
//! - Routine selection (queue building)
//! - Segment preview with target reps
//! - Rep feedback (history append + session log)
//! - Summary evaluation

use crate::config::{SessionConfig, TargetConfig};
use crate::history::{target_reps, RepStore};
use crate::session::{SessionState, Stage};
use crate::summary::{self, SessionSummary};
use crate::{routine, Catalog, Error, Exercise, RepRecord, Result, RoutineSelection, TargetReps};
use chrono::{DateTime, Utc};

/// What the user sees about a segment before or while doing it
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPreview {
    /// 1-based position in the queue
    pub position: usize,
    pub total: usize,
    pub exercise: Exercise,
    /// Countdown length after fast-forward substitution
    pub seconds: u32,
    pub target: TargetReps,
}

/// What comes after the current rest
#[derive(Clone, Debug, PartialEq)]
pub enum UpNext {
    Segment(SegmentPreview),
    Finish,
}

/// Result of confirming reps at the feedback prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Written to history and added to the session log
    Recorded,
    /// Added to the session log, but the history store rejected the write
    NotDurable(String),
    /// Not in `CollectingFeedback`; nothing changed
    Ignored,
}

/// Parse a rep count typed at the feedback prompt
pub fn parse_reps(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidReps("missing rep count".into()));
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| Error::InvalidReps(format!("'{}' is not a whole number", trimmed)))?;
    validate_reps(value)
}

fn validate_reps(value: i64) -> Result<u32> {
    if value < 0 {
        return Err(Error::InvalidReps(format!("{} is negative", value)));
    }
    u32::try_from(value).map_err(|_| Error::InvalidReps(format!("{} is too large", value)))
}

pub struct WorkoutEngine<'a, S: RepStore> {
    catalog: &'a Catalog,
    store: S,
    session: SessionConfig,
    targets: TargetConfig,
}

impl<'a, S: RepStore> WorkoutEngine<'a, S> {
    pub fn new(catalog: &'a Catalog, store: S, session: SessionConfig, targets: TargetConfig) -> Self {
        Self {
            catalog,
            store,
            session,
            targets,
        }
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn target_for(&self, exercise: &str) -> TargetReps {
        target_reps(&self.store, exercise, &self.targets)
    }

    /// Build the queue for `selection` and enter `Previewing`
    ///
    /// On error the state is left untouched. Returns `false` when the current
    /// stage doesn't accept a selection.
    pub fn select(&self, state: &mut SessionState, selection: RoutineSelection) -> Result<bool> {
        if !matches!(state.stage(), Stage::Selecting | Stage::Summary) {
            return Ok(false);
        }
        let queue = routine::build(selection)?;
        state.begin(selection, queue)
    }

    /// Like [`select`](Self::select), resolving the routine by name first
    pub fn select_by_name(&self, state: &mut SessionState, name: &str) -> Result<bool> {
        let selection: RoutineSelection = name.parse()?;
        self.select(state, selection)
    }

    fn preview_at(&self, state: &SessionState, index: usize) -> Option<SegmentPreview> {
        let segment = state.queue().get(index)?;
        Some(SegmentPreview {
            position: index + 1,
            total: state.queue().len(),
            exercise: self.catalog.lookup(&segment.exercise).into_owned(),
            seconds: self.session.segment_seconds(segment.duration_seconds),
            target: self.target_for(&segment.exercise),
        })
    }

    /// Catalog info and target for the current segment
    pub fn preview(&self, state: &SessionState) -> Option<SegmentPreview> {
        state.current_segment()?;
        self.preview_at(state, state.index())
    }

    /// Shown while resting: the next segment, or the finish line
    pub fn up_next(&self, state: &SessionState) -> Option<UpNext> {
        if !matches!(state.stage(), Stage::Resting(_)) {
            return None;
        }
        Some(
            self.preview_at(state, state.index() + 1)
                .map_or(UpNext::Finish, UpNext::Segment),
        )
    }

    /// Value the feedback prompt is pre-filled with
    pub fn feedback_prefill(&self, state: &SessionState) -> Option<u32> {
        if state.stage() != Stage::CollectingFeedback {
            return None;
        }
        let segment = state.current_segment()?;
        Some(self.target_for(&segment.exercise).prefill())
    }

    /// Confirm the reps performed for the segment just finished
    ///
    /// Negative counts are rejected and leave the stage unchanged. A history
    /// write failure doesn't stop the session: the reps still count towards
    /// the summary and the failure is reported as
    /// [`FeedbackOutcome::NotDurable`].
    pub fn confirm_reps(
        &mut self,
        state: &mut SessionState,
        reps: i64,
        at: DateTime<Utc>,
    ) -> Result<FeedbackOutcome> {
        let reps = validate_reps(reps)?;
        if state.stage() != Stage::CollectingFeedback {
            return Ok(FeedbackOutcome::Ignored);
        }
        let Some(segment) = state.current_segment() else {
            return Ok(FeedbackOutcome::Ignored);
        };

        let record = RepRecord::new(segment.exercise.clone(), reps, at);
        let outcome = match self.store.append(&record) {
            Ok(()) => FeedbackOutcome::Recorded,
            Err(e) => {
                tracing::warn!(
                    "Failed to persist {} x {}: {}. Keeping it for this session only.",
                    record.reps,
                    record.exercise,
                    e
                );
                FeedbackOutcome::NotDurable(e.to_string())
            }
        };

        state.record_feedback(reps, &self.session);
        tracing::info!("Logged {} x {}", reps, record.exercise);
        Ok(outcome)
    }

    /// Evaluate the finished session; `None` outside `Summary`
    pub fn summary(&self, state: &SessionState) -> Option<SessionSummary> {
        if state.stage() != Stage::Summary {
            return None;
        }
        let selection = state.selection()?;
        Some(summary::evaluate(
            selection,
            state.rep_log(),
            &self.targets,
            |exercise| self.target_for(exercise),
        ))
    }
}
