mod engine;

pub use engine::{TimerEngine, TimerEvent, TimerState, DEFAULT_TICK_INTERVAL, MAX_TICK_INTERVAL};
