//! Boundary to the audio/notification collaborator.
//!
//! The playback engine only pushes [`Cue`]s into a dispatcher and reads the
//! two streams the dispatcher owns: the name being read aloud and the
//! combined sound state. It never writes to either.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::events::Cue;

/// Sounds the dispatcher has played so far in this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoundState {
    pub activity_finishes: u32,
    pub break_ends: u32,
    pub training_completed: u32,
}

/// Every audio backend implements this trait.
pub trait NotificationDispatcher: Send + Sync {
    /// Hand over a cue. Must return without waiting on playback.
    fn notify_event(&self, cue: Cue);

    /// Name of the activity currently being read aloud, if any.
    fn read_aloud(&self) -> watch::Receiver<Option<String>>;

    /// Combined sound-state stream.
    fn sound_state(&self) -> watch::Receiver<SoundState>;
}

/// Dispatcher that keeps every cue it receives.
///
/// Useful for tests and for hosts that play sounds elsewhere; the host can
/// publish read-aloud and sound values through [`RecordingDispatcher::announce`]
/// and [`RecordingDispatcher::set_sound_state`].
pub struct RecordingDispatcher {
    cues: Mutex<Vec<Cue>>,
    read_aloud: watch::Sender<Option<String>>,
    sound: watch::Sender<SoundState>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            cues: Mutex::new(Vec::new()),
            read_aloud: watch::Sender::new(None),
            sound: watch::Sender::new(SoundState::default()),
        }
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn cue_kinds(&self) -> Vec<&'static str> {
        self.cues().iter().map(Cue::kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut cues) = self.cues.lock() {
            cues.clear();
        }
    }

    pub fn announce(&self, name: Option<String>) {
        self.read_aloud.send_replace(name);
    }

    pub fn set_sound_state(&self, state: SoundState) {
        self.sound.send_replace(state);
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    /// Records the cue. A `TrainingCompleted` cue also counts as the
    /// completion sound having played.
    fn notify_event(&self, cue: Cue) {
        if matches!(cue, Cue::TrainingCompleted { .. }) {
            self.sound.send_modify(|s| s.training_completed += 1);
        }
        if let Ok(mut cues) = self.cues.lock() {
            cues.push(cue);
        }
    }

    fn read_aloud(&self) -> watch::Receiver<Option<String>> {
        self.read_aloud.subscribe()
    }

    fn sound_state(&self) -> watch::Receiver<SoundState> {
        self.sound.subscribe()
    }
}
