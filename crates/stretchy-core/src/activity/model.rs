use serde::{Deserialize, Deserializer, Serialize};

use super::pages::{PageMap, RawIndex};
use crate::error::SequenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Stretch,
    Exercise,
    /// Performed at the user's pace; never counts down.
    TimelessExercise,
    Break,
}

impl ActivityType {
    pub fn is_break(self) -> bool {
        matches!(self, ActivityType::Break)
    }

    /// Whether the activity runs against a countdown.
    pub fn is_timed(self) -> bool {
        match self {
            ActivityType::Stretch | ActivityType::Exercise | ActivityType::Break => true,
            ActivityType::TimelessExercise => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    /// Duration in seconds. Zero for timeless exercises.
    #[serde(default, deserialize_with = "non_negative_secs")]
    pub duration_secs: u64,
    pub activity_type: ActivityType,
}

/// Negative durations are stored as zero; playback passes such an activity
/// through instead of refusing the whole plan.
fn non_negative_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let secs = i64::deserialize(deserializer)?;
    Ok(u64::try_from(secs).unwrap_or(0))
}

impl Activity {
    pub fn new(name: impl Into<String>, duration_secs: u64, activity_type: ActivityType) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            activity_type,
        }
    }

    pub fn exercise(name: impl Into<String>, duration_secs: u64) -> Self {
        Self::new(name, duration_secs, ActivityType::Exercise)
    }

    pub fn stretch(name: impl Into<String>, duration_secs: u64) -> Self {
        Self::new(name, duration_secs, ActivityType::Stretch)
    }

    pub fn timeless(name: impl Into<String>) -> Self {
        Self::new(name, 0, ActivityType::TimelessExercise)
    }

    pub fn rest(duration_secs: u64) -> Self {
        Self::new("Break", duration_secs, ActivityType::Break)
    }

    /// Get activity duration in milliseconds.
    ///
    /// Uses saturating arithmetic so absurd plan values cannot overflow.
    pub fn duration_ms(&self) -> u64 {
        self.duration_secs.saturating_mul(1000)
    }
}

/// Direction of a user page skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Forward,
    Backward,
}

/// Ordered, immutable list of activities for one session.
///
/// A break always sits right after the exercise it belongs to; a trailing
/// break is allowed and simply ends the session.
#[derive(Debug, Clone)]
pub struct ActivitySequence {
    activities: Vec<Activity>,
    pages: PageMap,
}

impl ActivitySequence {
    pub fn new(activities: Vec<Activity>) -> Result<Self, SequenceError> {
        if activities.is_empty() {
            return Err(SequenceError::Empty);
        }
        for (index, pair) in activities.windows(2).enumerate() {
            if pair[0].activity_type.is_break() && pair[1].activity_type.is_break() {
                return Err(SequenceError::ConsecutiveBreaks { index: index + 1 });
            }
        }
        if activities[0].activity_type.is_break() {
            return Err(SequenceError::LeadingBreak);
        }
        let pages = PageMap::build(&activities);
        Ok(Self { activities, pages })
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn get(&self, index: RawIndex) -> Option<&Activity> {
        self.activities.get(index.get())
    }

    pub fn pages(&self) -> &PageMap {
        &self.pages
    }

    /// A session is over once the cursor runs past the end, or rests on a
    /// trailing break.
    pub fn is_finished_at(&self, index: RawIndex) -> bool {
        match self.get(index) {
            None => true,
            Some(activity) => {
                index.get() + 1 == self.activities.len() && activity.activity_type.is_break()
            }
        }
    }

    /// Name of the first non-break activity after `index`.
    pub fn lookahead_name(&self, index: RawIndex) -> Option<&str> {
        self.activities
            .iter()
            .skip(index.get() + 1)
            .find(|a| !a.activity_type.is_break())
            .map(|a| a.name.as_str())
    }

    /// Raw index reached by skipping one merged page from `from`.
    ///
    /// A page is an exercise plus its optional break, so a skip that would
    /// land on a break steps over it. Returns `None` when the target falls
    /// outside the sequence.
    pub fn skip_target(&self, from: RawIndex, direction: SkipDirection) -> Option<RawIndex> {
        let index = from.get();
        let target = match direction {
            SkipDirection::Forward => {
                let step = if self.is_break_at(index + 1) { 2 } else { 1 };
                index + step
            }
            SkipDirection::Backward => {
                let step = match index.checked_sub(1) {
                    Some(prev) if self.is_break_at(prev) => 2,
                    _ => 1,
                };
                index.checked_sub(step)?
            }
        };
        (target < self.activities.len()).then_some(RawIndex::new(target))
    }

    fn is_break_at(&self, index: usize) -> bool {
        self.activities
            .get(index)
            .is_some_and(|a| a.activity_type.is_break())
    }
}
