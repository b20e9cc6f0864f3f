use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::Activity;

/// Playback milestones handed to the notification dispatcher.
/// Fire-and-forget: the engine never waits on their handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Cue {
    /// A new activity became current.
    ActivityUpdate {
        activity: Activity,
        is_first: bool,
        /// First non-break activity after this one.
        next_name: Option<String>,
        at: DateTime<Utc>,
    },
    /// The current activity is about to run out.
    ActivityEnds { at: DateTime<Utc> },
    /// The user swiped to another page.
    ActivitySwiped { at: DateTime<Utc> },
    /// The session reached Completed.
    TrainingCompleted { at: DateTime<Utc> },
}

impl Cue {
    pub fn activity_update(activity: Activity, is_first: bool, next_name: Option<String>) -> Self {
        Cue::ActivityUpdate {
            activity,
            is_first,
            next_name,
            at: Utc::now(),
        }
    }

    pub fn activity_ends() -> Self {
        Cue::ActivityEnds { at: Utc::now() }
    }

    pub fn activity_swiped() -> Self {
        Cue::ActivitySwiped { at: Utc::now() }
    }

    pub fn training_completed() -> Self {
        Cue::TrainingCompleted { at: Utc::now() }
    }

    /// Short tag, handy for logs and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Cue::ActivityUpdate { .. } => "activity_update",
            Cue::ActivityEnds { .. } => "activity_ends",
            Cue::ActivitySwiped { .. } => "activity_swiped",
            Cue::TrainingCompleted { .. } => "training_completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_serializes_with_type_tag() {
        let cue = Cue::activity_update(Activity::exercise("Squats", 30), true, None);
        let json = serde_json::to_value(&cue).unwrap();
        assert_eq!(json["type"], "ActivityUpdate");
        assert_eq!(json["activity"]["name"], "Squats");
        assert_eq!(json["is_first"], true);
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Cue::activity_ends().kind(), "activity_ends");
        assert_eq!(Cue::activity_swiped().kind(), "activity_swiped");
        assert_eq!(Cue::training_completed().kind(), "training_completed");
    }
}
