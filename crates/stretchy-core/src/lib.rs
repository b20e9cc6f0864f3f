//! # Stretchy Core Library
//!
//! Playback engine for guided training sessions: an ordered list of
//! stretches, exercises and breaks is played back one activity at a time
//! against a countdown, with audio cues along the way and a summary at the
//! end. The `stretchy` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Activity model**: the raw activity list and its merged page view,
//!   where each break shares the page of the exercise before it
//! - **Timer Engine**: tick producer running as its own task
//! - **Playback**: a synchronous state machine plus the async session actor
//!   that drives it and publishes [`UiSnapshot`]s
//! - **Storage**: TOML configuration and TOML training plans
//!
//! ## Key Components
//!
//! - [`PlaybackEngine`]: starts a session and hands back a [`SessionHandle`]
//! - [`PlaybackStateMachine`]: every playback rule, free of I/O
//! - [`Repository`]: where trainings come from
//! - [`NotificationDispatcher`]: where cues go

pub mod activity;
pub mod error;
pub mod events;
pub mod notify;
pub mod playback;
pub mod repository;
pub mod storage;
pub mod timer;

pub use activity::{Activity, ActivitySequence, ActivityType, DisplayPage, PageMap, RawIndex};
pub use error::{ConfigError, CoreError, RepositoryError, Result, SequenceError};
pub use events::Cue;
pub use notify::{NotificationDispatcher, RecordingDispatcher, SoundState};
pub use playback::{
    ActivityView, PlaybackEngine, PlaybackOptions, PlaybackStateMachine, SessionHandle,
    SessionSummary, UiSnapshot,
};
pub use repository::{InMemoryRepository, Repository, Training, TrainingId};
pub use storage::{Config, TrainingStore};
pub use timer::{TimerEngine, TimerEvent, TimerState};
