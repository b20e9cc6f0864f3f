use std::time::Duration;

use crate::activity::ActivityType;
use crate::storage::Config;
use crate::timer::DEFAULT_TICK_INTERVAL;

/// How long before zero an activity announces that it is about to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueThresholds {
    pub exercise_ends_before_ms: u64,
    pub break_ends_before_ms: u64,
}

impl CueThresholds {
    /// `None` for activities that never count down.
    pub fn for_type(&self, activity_type: ActivityType) -> Option<u64> {
        match activity_type {
            ActivityType::Stretch | ActivityType::Exercise => Some(self.exercise_ends_before_ms),
            ActivityType::Break => Some(self.break_ends_before_ms),
            ActivityType::TimelessExercise => None,
        }
    }
}

impl Default for CueThresholds {
    fn default() -> Self {
        Self {
            exercise_ends_before_ms: 3_000,
            break_ends_before_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub tick_interval: Duration,
    /// Start the first countdown as soon as the training is loaded.
    pub autostart: bool,
    /// Delay before a page left behind drops its break overlay.
    pub restore_delay: Duration,
    pub thresholds: CueThresholds,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            autostart: true,
            restore_delay: Duration::from_millis(250),
            thresholds: CueThresholds::default(),
        }
    }
}

impl From<&Config> for PlaybackOptions {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.playback.tick_interval_ms),
            autostart: config.playback.autostart,
            restore_delay: Duration::from_millis(config.playback.restore_delay_ms),
            thresholds: CueThresholds {
                exercise_ends_before_ms: config.cues.exercise_ends_before_ms,
                break_ends_before_ms: config.cues.break_ends_before_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_follow_activity_kind() {
        let thresholds = CueThresholds::default();
        assert_eq!(thresholds.for_type(ActivityType::Exercise), Some(3_000));
        assert_eq!(thresholds.for_type(ActivityType::Stretch), Some(3_000));
        assert_eq!(thresholds.for_type(ActivityType::Break), Some(100));
        assert_eq!(thresholds.for_type(ActivityType::TimelessExercise), None);
    }

    #[test]
    fn options_mirror_config() {
        let mut config = Config::default();
        config.playback.tick_interval_ms = 50;
        config.playback.autostart = false;
        config.cues.break_ends_before_ms = 500;

        let options = PlaybackOptions::from(&config);
        assert_eq!(options.tick_interval, Duration::from_millis(50));
        assert!(!options.autostart);
        assert_eq!(options.restore_delay, Duration::from_millis(250));
        assert_eq!(options.thresholds.break_ends_before_ms, 500);
    }
}
