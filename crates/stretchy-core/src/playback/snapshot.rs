use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityType, DisplayPage};
use crate::notify::SoundState;

/// Outcome of a finished session. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub elapsed_seconds: u64,
    /// Distinct merged pages visited.
    pub exercise_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, exercise_count: usize) -> Self {
        let elapsed_ms = (finished_at - started_at).num_milliseconds().max(0);
        Self {
            elapsed_seconds: u64::try_from(elapsed_ms / 1000).unwrap_or(0),
            exercise_count,
            started_at,
            finished_at,
        }
    }

    /// Training time as `m:ss`.
    pub fn elapsed_label(&self) -> String {
        format!("{}:{:02}", self.elapsed_seconds / 60, self.elapsed_seconds % 60)
    }
}

/// What the rendering layer needs while an activity runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityView {
    pub name: String,
    pub next_name: Option<String>,
    pub activity_type: ActivityType,
    pub current_ms: u64,
    pub total_ms: u64,
    /// 0.0 .. 100.0 progress across pages.
    pub progress_percent: f64,
    pub page: DisplayPage,
    pub page_count: usize,
    pub paused: bool,
    /// Display type per page; a page shows `Break` while its break runs.
    pub page_types: Vec<ActivityType>,
    pub read_aloud: Option<String>,
    pub sound: SoundState,
}

/// Single current value published to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UiSnapshot {
    Loading,
    Error { message: String },
    ActivityInProgress(ActivityView),
    Completed {
        summary: SessionSummary,
        /// Dispatcher sound state at the end, including the completion sound.
        sound: SoundState,
    },
}

impl UiSnapshot {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UiSnapshot::Error { .. } | UiSnapshot::Completed { .. })
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        match self {
            UiSnapshot::Completed { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn activity(&self) -> Option<&ActivityView> {
        match self {
            UiSnapshot::ActivityInProgress(view) => Some(view),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn summary_floors_elapsed_seconds() {
        let start = Utc::now();
        let summary = SessionSummary::new(start, start + Duration::milliseconds(61_999), 3);
        assert_eq!(summary.elapsed_seconds, 61);
        assert_eq!(summary.elapsed_label(), "1:01");
        assert_eq!(summary.exercise_count, 3);
    }

    #[test]
    fn summary_clamps_clock_going_backwards() {
        let start = Utc::now();
        let summary = SessionSummary::new(start, start - Duration::seconds(5), 0);
        assert_eq!(summary.elapsed_seconds, 0);
        assert_eq!(summary.elapsed_label(), "0:00");
    }

    #[test]
    fn snapshot_serializes_with_state_tag() {
        let json = serde_json::to_value(UiSnapshot::Loading).unwrap();
        assert_eq!(json["state"], "loading");

        let err = UiSnapshot::Error {
            message: "boom".into(),
        };
        assert!(err.is_terminal());
        assert_eq!(serde_json::to_value(&err).unwrap()["state"], "error");
    }
}
