//! Session playback: the pure state machine, its async driver and the
//! snapshot it publishes.

mod machine;
mod options;
mod session;
mod snapshot;

pub use machine::{Directive, PlaybackCursor, PlaybackStateMachine};
pub use options::{CueThresholds, PlaybackOptions};
pub use session::{PlaybackEngine, SessionHandle};
pub use snapshot::{ActivityView, SessionSummary, UiSnapshot};
