//! Guided workout session state machine.
//!
//! A [`SessionState`] is an owned value threaded through every entry point;
//! there is no process-wide session. Stages carry only the data relevant to
//! them: the countdown lives inside `Counting` and `Resting`.
//!
//! ```text
//! Selecting -> Previewing -> Counting -> CollectingFeedback -> Resting
//!                  ^                                              |
//!                  +---------------- index < len -----------------+
//!                                    index == len -> Summary -> Selecting
//! ```
//!
//! Ticks are pure steps (`tick(state, elapsed) -> state`). A countdown that
//! reaches zero, whether by ticking or by skip, goes through the same
//! zero-crossing transition. Actions that don't apply to the current stage are
//! ignored and report `false`.

use crate::config::SessionConfig;
use crate::{Error, Queue, Result, RoutineSelection, Segment};
use std::collections::BTreeMap;

/// A running or paused countdown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    remaining_seconds: u32,
    running: bool,
}

impl Countdown {
    fn armed(seconds: u32) -> Self {
        Self {
            remaining_seconds: seconds,
            running: true,
        }
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Decrement, clamping at zero; reports whether the countdown is done
    fn advance(&mut self, elapsed_seconds: u32) -> bool {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(elapsed_seconds);
        self.remaining_seconds == 0
    }
}

/// Discrete phase of a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Selecting,
    Previewing,
    Counting(Countdown),
    CollectingFeedback,
    Resting(Countdown),
    Summary,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Selecting => "selecting",
            Stage::Previewing => "previewing",
            Stage::Counting(_) => "counting",
            Stage::CollectingFeedback => "collecting_feedback",
            Stage::Resting(_) => "resting",
            Stage::Summary => "summary",
        }
    }

    fn countdown(&self) -> Option<&Countdown> {
        match self {
            Stage::Counting(c) | Stage::Resting(c) => Some(c),
            _ => None,
        }
    }

    fn countdown_mut(&mut self) -> Option<&mut Countdown> {
        match self {
            Stage::Counting(c) | Stage::Resting(c) => Some(c),
            _ => None,
        }
    }
}

/// The single mutable aggregate for one workout
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    selection: Option<RoutineSelection>,
    queue: Queue,
    index: usize,
    stage: Stage,
    rep_log: BTreeMap<String, u32>,
}

impl SessionState {
    /// A fresh state in `Selecting`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn selection(&self) -> Option<RoutineSelection> {
        self.selection
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Seconds left on the active countdown, 0 when there is none
    pub fn remaining_seconds(&self) -> u32 {
        self.stage.countdown().map_or(0, Countdown::remaining_seconds)
    }

    /// Whether ticks should currently be scheduled
    pub fn timer_running(&self) -> bool {
        self.stage.countdown().is_some_and(Countdown::is_running)
    }

    /// Cumulative reps logged this session, per exercise
    pub fn rep_log(&self) -> &BTreeMap<String, u32> {
        &self.rep_log
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Selecting
    }

    /// Segment the session is working on, if any
    pub fn current_segment(&self) -> Option<&Segment> {
        match self.stage {
            Stage::Selecting | Stage::Summary => None,
            _ => self.queue.get(self.index),
        }
    }

    /// Segment that follows the current one; `None` while resting means finish
    pub fn next_segment(&self) -> Option<&Segment> {
        self.current_segment()
            .and_then(|_| self.queue.get(self.index + 1))
    }

    /// Enter `Previewing` for the first segment of a freshly built queue
    ///
    /// Accepted from `Selecting` and `Summary`; any previous session log is
    /// discarded.
    pub fn begin(&mut self, selection: RoutineSelection, queue: Queue) -> Result<bool> {
        if !matches!(self.stage, Stage::Selecting | Stage::Summary) {
            tracing::debug!("Ignoring routine selection during {}", self.stage.name());
            return Ok(false);
        }
        if queue.is_empty() {
            return Err(Error::Config(format!(
                "routine '{}' has no segments",
                selection
            )));
        }

        *self = Self {
            selection: Some(selection),
            queue,
            index: 0,
            stage: Stage::Previewing,
            rep_log: BTreeMap::new(),
        };
        tracing::info!(
            "Session started: {} ({} segments)",
            selection,
            self.queue.len()
        );
        Ok(true)
    }

    /// Arm the countdown for the previewed segment
    pub fn start(&mut self, config: &SessionConfig) -> bool {
        if self.stage != Stage::Previewing {
            return false;
        }
        let Some(segment) = self.queue.get(self.index) else {
            return false;
        };

        let seconds = config.segment_seconds(segment.duration_seconds);
        tracing::info!(
            "Segment {}/{}: {} for {}s",
            self.index + 1,
            self.queue.len(),
            segment.exercise,
            seconds
        );
        self.stage = Stage::Counting(Countdown::armed(seconds));
        true
    }

    pub fn pause(&mut self) -> bool {
        self.set_running(false)
    }

    pub fn resume(&mut self) -> bool {
        self.set_running(true)
    }

    fn set_running(&mut self, running: bool) -> bool {
        match self.stage.countdown_mut() {
            Some(countdown) if countdown.running != running => {
                countdown.running = running;
                tracing::debug!(
                    "Countdown {} with {}s left",
                    if running { "resumed" } else { "paused" },
                    countdown.remaining_seconds
                );
                true
            }
            _ => false,
        }
    }

    /// Finish the active countdown immediately
    ///
    /// Works in `Counting` ("mark done") and `Resting`, paused or not.
    pub fn skip(&mut self) -> bool {
        let Some(countdown) = self.stage.countdown_mut() else {
            return false;
        };
        countdown.remaining_seconds = 0;
        self.cross_zero();
        true
    }

    /// Lengthen the current rest
    pub fn add_rest(&mut self, config: &SessionConfig) -> bool {
        match &mut self.stage {
            Stage::Resting(countdown) => {
                countdown.remaining_seconds = countdown
                    .remaining_seconds
                    .saturating_add(config.extra_rest_seconds());
                true
            }
            _ => false,
        }
    }

    /// One scheduled tick
    ///
    /// Decrements a running countdown by `elapsed_seconds`, never below zero,
    /// and performs the stage transition once it is at zero. Paused or
    /// countdown-less stages are returned unchanged.
    pub fn tick(mut self, elapsed_seconds: u32) -> Self {
        let done = match self.stage.countdown_mut() {
            Some(countdown) if countdown.running => countdown.advance(elapsed_seconds),
            _ => false,
        };
        if done {
            self.cross_zero();
        }
        self
    }

    /// The zero-crossing transition shared by ticks and skip
    fn cross_zero(&mut self) {
        match self.stage {
            Stage::Counting(_) => {
                tracing::debug!("Segment {} finished, collecting feedback", self.index + 1);
                self.stage = Stage::CollectingFeedback;
            }
            Stage::Resting(_) => {
                self.index += 1;
                if self.index < self.queue.len() {
                    self.stage = Stage::Previewing;
                } else {
                    tracing::info!("Queue exhausted, session complete");
                    self.stage = Stage::Summary;
                }
            }
            _ => {}
        }
    }

    /// Log confirmed reps and arm the rest timer
    ///
    /// Returns the exercise the reps were credited to.
    pub(crate) fn record_feedback(&mut self, reps: u32, config: &SessionConfig) -> Option<String> {
        if self.stage != Stage::CollectingFeedback {
            return None;
        }
        let exercise = self.queue.get(self.index)?.exercise.clone();

        let total = self.rep_log.entry(exercise.clone()).or_insert(0);
        *total = total.saturating_add(reps);
        self.stage = Stage::Resting(Countdown::armed(config.rest_seconds()));
        Some(exercise)
    }

    /// Leave `Summary`, discarding the session
    pub fn finish(&mut self) -> bool {
        if self.stage != Stage::Summary {
            return false;
        }
        *self = Self::new();
        true
    }

    /// Abandon the session from any stage
    ///
    /// Reps already written to history stay there.
    pub fn quit(&mut self) {
        if self.is_active() {
            tracing::info!("Session quit during {}", self.stage.name());
        }
        *self = Self::new();
    }
}
