//! Playback state machine.
//!
//! Synchronous and free of I/O: every operation mutates the cursor and
//! returns the [`Directive`]s the session driver has to carry out (timer
//! control, cue dispatch, debounce scheduling). The driver feeds timer
//! samples back through [`PlaybackStateMachine::on_tick`] and
//! [`PlaybackStateMachine::on_timer_exhausted`].
//!
//! ## State Transitions
//!
//! ```text
//! Loading -> ActivityInProgress -> ... -> Completed
//!         \-> Error
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::options::CueThresholds;
use super::snapshot::{ActivityView, SessionSummary, UiSnapshot};
use crate::activity::{Activity, ActivitySequence, ActivityType, DisplayPage, RawIndex, SkipDirection};
use crate::error::RepositoryError;
use crate::events::Cue;
use crate::notify::SoundState;
use crate::repository::Training;

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Dispatch(Cue),
    /// Reconfigure the timer for a new activity, optionally running.
    ArmTimer { duration_secs: u64, running: bool },
    /// Current activity has no countdown.
    HoldTimer,
    PauseTimer,
    ResumeTimer,
    /// Restore the page's natural display type after the debounce delay.
    ScheduleRestore(DisplayPage),
    /// Session is over: stop the timer and drop pending restores.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    pub raw: RawIndex,
    pub page: DisplayPage,
}

struct Running {
    sequence: ActivitySequence,
    cursor: PlaybackCursor,
    paused: bool,
    ends_cue_fired: bool,
    current_ms: u64,
    total_ms: u64,
    visited: BTreeSet<DisplayPage>,
    page_types: Vec<ActivityType>,
}

enum Phase {
    Loading,
    Running(Running),
    Completed(SessionSummary),
    Failed(String),
}

pub struct PlaybackStateMachine {
    phase: Phase,
    thresholds: CueThresholds,
    autostart: bool,
    started_at: DateTime<Utc>,
    read_aloud: Option<String>,
    sound: SoundState,
}

impl PlaybackStateMachine {
    /// A session starts counting wall-clock time from here.
    pub fn new(thresholds: CueThresholds, autostart: bool) -> Self {
        Self {
            phase: Phase::Loading,
            thresholds,
            autostart,
            started_at: Utc::now(),
            read_aloud: None,
            sound: SoundState::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn cursor(&self) -> Option<PlaybackCursor> {
        match &self.phase {
            Phase::Running(run) => Some(run.cursor),
            _ => None,
        }
    }

    pub fn current_activity(&self) -> Option<&Activity> {
        match &self.phase {
            Phase::Running(run) => run.sequence.get(run.cursor.raw),
            _ => None,
        }
    }

    pub fn is_paused(&self) -> bool {
        match &self.phase {
            Phase::Running(run) => run.paused,
            _ => true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Completed(_) | Phase::Failed(_))
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        match &self.phase {
            Phase::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> UiSnapshot {
        match &self.phase {
            Phase::Loading => UiSnapshot::Loading,
            Phase::Failed(message) => UiSnapshot::Error {
                message: message.clone(),
            },
            Phase::Completed(summary) => UiSnapshot::Completed {
                summary: summary.clone(),
                sound: self.sound,
            },
            Phase::Running(run) => match run.sequence.get(run.cursor.raw) {
                Some(activity) => UiSnapshot::ActivityInProgress(self.view(run, activity)),
                None => UiSnapshot::Loading,
            },
        }
    }

    fn view(&self, run: &Running, activity: &Activity) -> ActivityView {
        let page_count = run.sequence.pages().len();
        let progress_percent = if page_count == 0 {
            0.0
        } else {
            run.cursor.page.get() as f64 / page_count as f64 * 100.0
        };
        ActivityView {
            name: activity.name.clone(),
            next_name: run.sequence.lookahead_name(run.cursor.raw).map(str::to_owned),
            activity_type: activity.activity_type,
            current_ms: run.current_ms,
            total_ms: run.total_ms,
            progress_percent,
            page: run.cursor.page,
            page_count,
            paused: run.paused,
            page_types: run.page_types.clone(),
            read_aloud: self.read_aloud.clone(),
            sound: self.sound,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Take the repository result and announce the first activity.
    pub fn load(&mut self, loaded: Result<Training, RepositoryError>) -> Vec<Directive> {
        if !matches!(self.phase, Phase::Loading) {
            debug!("training already loaded");
            return Vec::new();
        }

        let sequence = loaded.and_then(|training| {
            let id = training.id;
            ActivitySequence::new(training.activities)
                .map_err(|source| RepositoryError::InvalidPlan { id, source })
        });
        let sequence = match sequence {
            Ok(sequence) => sequence,
            Err(err) => {
                warn!(error = %err, "training failed to load");
                self.phase = Phase::Failed(err.to_string());
                return vec![Directive::Stop];
            }
        };

        info!(
            activities = sequence.len(),
            pages = sequence.pages().len(),
            "training loaded"
        );
        let page_types = sequence
            .pages()
            .iter()
            .filter_map(|(_, page)| sequence.get(page.exercise))
            .map(|a| a.activity_type)
            .collect();
        self.phase = Phase::Running(Running {
            sequence,
            cursor: PlaybackCursor {
                raw: RawIndex::new(0),
                page: DisplayPage::new(0),
            },
            paused: true,
            ends_cue_fired: false,
            current_ms: 0,
            total_ms: 0,
            visited: BTreeSet::new(),
            page_types,
        });

        let mut out = Vec::new();
        self.settle(&mut out, self.autostart, true);
        out
    }

    /// One countdown sample for the current activity.
    pub fn on_tick(&mut self, remaining_ms: u64) -> Vec<Directive> {
        let Phase::Running(run) = &mut self.phase else {
            return Vec::new();
        };
        run.current_ms = remaining_ms;

        let Some(activity_type) = run.sequence.get(run.cursor.raw).map(|a| a.activity_type) else {
            return Vec::new();
        };
        if run.ends_cue_fired {
            return Vec::new();
        }
        match self.thresholds.for_type(activity_type) {
            Some(threshold) if remaining_ms <= threshold => {
                run.ends_cue_fired = true;
                vec![Directive::Dispatch(Cue::activity_ends())]
            }
            _ => Vec::new(),
        }
    }

    /// Natural completion of the current countdown.
    pub fn on_timer_exhausted(&mut self) -> Vec<Directive> {
        let Phase::Running(run) = &mut self.phase else {
            return Vec::new();
        };
        let running = !run.paused;
        run.cursor.raw = run.cursor.raw.next();

        let mut out = Vec::new();
        self.settle(&mut out, running, false);
        out
    }

    /// External completion of the current activity, e.g. a timeless
    /// exercise the user marked as done.
    pub fn finish_activity(&mut self) -> Vec<Directive> {
        let Phase::Running(run) = &mut self.phase else {
            debug!("finish_activity ignored outside of playback");
            return Vec::new();
        };
        run.cursor.raw = run.cursor.raw.next();

        let mut out = Vec::new();
        self.settle(&mut out, true, false);
        out
    }

    /// Navigate to `destination`. Only user skips move the cursor; any other
    /// page change must agree with the cursor already.
    pub fn change_page(&mut self, destination: DisplayPage, is_user_skip: bool) -> Vec<Directive> {
        let Phase::Running(run) = &mut self.phase else {
            debug!(%destination, "page change ignored outside of playback");
            return Vec::new();
        };
        let current = run.cursor.page;
        if destination == current {
            return Vec::new();
        }
        if !is_user_skip {
            debug!(%destination, %current, "page sync disagrees with cursor, ignored");
            return Vec::new();
        }

        let direction = if destination > current {
            SkipDirection::Forward
        } else {
            SkipDirection::Backward
        };
        let Some(target) = run.sequence.skip_target(run.cursor.raw, direction) else {
            debug!(from = %run.cursor.raw, ?direction, "skip target out of bounds, rejected");
            return Vec::new();
        };
        info!(from = %run.cursor.raw, to = %target, ?direction, "user skip");

        let mut out = Vec::new();
        if run.sequence.pages().page_of(target) == Some(current) {
            // Leaving this page's break for its own exercise.
            out.push(Directive::ScheduleRestore(current));
        }
        run.cursor.raw = target;

        self.settle(&mut out, true, false);
        if !self.is_terminal() {
            out.push(Directive::Dispatch(Cue::activity_swiped()));
        }
        out
    }

    pub fn toggle_start_stop_timer(&mut self) -> Vec<Directive> {
        let Phase::Running(run) = &mut self.phase else {
            return Vec::new();
        };
        let timed = run
            .sequence
            .get(run.cursor.raw)
            .is_some_and(|a| a.activity_type.is_timed());
        if !timed {
            debug!("current activity has no countdown to toggle");
            return Vec::new();
        }

        run.paused = !run.paused;
        if run.paused {
            info!("timer paused");
            vec![Directive::PauseTimer]
        } else {
            info!("timer resumed");
            vec![Directive::ResumeTimer]
        }
    }

    /// Force-terminate the session. Idempotent once Completed.
    pub fn end_training(&mut self) -> Vec<Directive> {
        match self.phase {
            Phase::Completed(_) | Phase::Failed(_) => Vec::new(),
            Phase::Loading | Phase::Running(_) => {
                let mut out = Vec::new();
                self.complete(&mut out);
                out
            }
        }
    }

    /// Debounce elapsed: the page shows its exercise again.
    pub fn restore_page(&mut self, page: DisplayPage) {
        let Phase::Running(run) = &mut self.phase else {
            return;
        };
        let break_running_here = run.cursor.page == page
            && run
                .sequence
                .get(run.cursor.raw)
                .is_some_and(|a| a.activity_type.is_break());
        if break_running_here {
            return;
        }
        let natural = run
            .sequence
            .pages()
            .raw_of(page)
            .and_then(|raw| run.sequence.get(raw))
            .map(|a| a.activity_type);
        if let (Some(natural), Some(slot)) = (natural, run.page_types.get_mut(page.get())) {
            *slot = natural;
        }
    }

    pub fn relay_read_aloud(&mut self, name: Option<String>) {
        if !self.is_terminal() {
            self.read_aloud = name;
        }
    }

    pub fn relay_sound(&mut self, sound: SoundState) {
        self.sound = sound;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn settle(&mut self, out: &mut Vec<Directive>, running: bool, is_first: bool) {
        let finished = match &mut self.phase {
            Phase::Running(run) => run.settle(out, running, is_first),
            _ => return,
        };
        if finished {
            self.complete(out);
        }
    }

    fn complete(&mut self, out: &mut Vec<Directive>) {
        let visited = match &self.phase {
            Phase::Running(run) => run.visited.len(),
            _ => 0,
        };
        let summary = SessionSummary::new(self.started_at, Utc::now(), visited);
        info!(
            elapsed_seconds = summary.elapsed_seconds,
            exercise_count = summary.exercise_count,
            "training completed"
        );
        self.read_aloud = None;
        self.phase = Phase::Completed(summary);
        out.push(Directive::Dispatch(Cue::training_completed()));
        out.push(Directive::Stop);
    }
}

impl Running {
    /// Make the activity under the cursor current. Returns true when the
    /// sequence is exhausted instead.
    fn settle(&mut self, out: &mut Vec<Directive>, running: bool, is_first: bool) -> bool {
        loop {
            if self.sequence.is_finished_at(self.cursor.raw) {
                return true;
            }
            let (Some(page), Some(activity)) = (
                self.sequence.pages().page_of(self.cursor.raw),
                self.sequence.get(self.cursor.raw).cloned(),
            ) else {
                return true;
            };

            if page != self.cursor.page {
                out.push(Directive::ScheduleRestore(self.cursor.page));
                self.cursor.page = page;
            }
            self.visited.insert(page);

            if activity.activity_type.is_timed() && activity.duration_secs == 0 {
                warn!(
                    activity = %activity.name,
                    index = %self.cursor.raw,
                    "timed activity without duration, passing through"
                );
                self.cursor.raw = self.cursor.raw.next();
                continue;
            }

            self.ends_cue_fired = false;
            match activity.activity_type {
                ActivityType::TimelessExercise => {
                    self.paused = true;
                    self.current_ms = 0;
                    self.total_ms = 0;
                    out.push(Directive::HoldTimer);
                }
                ActivityType::Stretch | ActivityType::Exercise | ActivityType::Break => {
                    self.paused = !running;
                    self.current_ms = activity.duration_ms();
                    self.total_ms = activity.duration_ms();
                    out.push(Directive::ArmTimer {
                        duration_secs: activity.duration_secs,
                        running,
                    });
                }
            }
            if activity.activity_type.is_break() {
                if let Some(slot) = self.page_types.get_mut(page.get()) {
                    *slot = ActivityType::Break;
                }
            }

            let next_name = self
                .sequence
                .lookahead_name(self.cursor.raw)
                .map(str::to_owned);
            debug!(index = %self.cursor.raw, %page, activity = %activity.name, "activity started");
            out.push(Directive::Dispatch(Cue::activity_update(
                activity, is_first, next_name,
            )));
            return false;
        }
    }
}
