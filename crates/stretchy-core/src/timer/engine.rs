//! Countdown timer for the current activity.
//!
//! The timer is a pure clock. Every `configure()` spawns a fresh producer
//! task that samples wall-clock deltas at a fixed granularity and pushes the
//! remaining time into a bounded channel. The consumer pulls samples with
//! [`TimerEngine::next_event`].
//!
//! ## State Transitions
//!
//! ```text
//! configure -> Paused <-> Running -> Exhausted
//! ```
//!
//! Reconfiguring or halting drops the previous channel, so samples from an
//! abandoned countdown can never be observed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Coarsest accepted granularity. Larger values are clamped to it.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Remaining milliseconds after one more tick.
    Tick(u64),
    /// The countdown reached zero and its producer stopped.
    Exhausted,
}

struct Countdown {
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
    ticks: mpsc::Receiver<u64>,
}

pub struct TimerEngine {
    tick_interval: Duration,
    state: TimerState,
    countdown: Option<Countdown>,
}

impl TimerEngine {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval: tick_interval.clamp(Duration::from_millis(1), MAX_TICK_INTERVAL),
            state: TimerState {
                paused: true,
                ..TimerState::default()
            },
            countdown: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn is_armed(&self) -> bool {
        self.countdown.is_some()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm a new countdown of `duration_secs`, initially paused.
    ///
    /// Must be called from within a tokio runtime.
    pub fn configure(&mut self, duration_secs: u64) {
        self.halt();
        let total_ms = duration_secs.saturating_mul(1000);
        self.state = TimerState {
            remaining_ms: total_ms,
            total_ms,
            paused: true,
        };

        let (paused_tx, paused_rx) = watch::channel(true);
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        tokio::spawn(run_countdown(
            total_ms,
            self.tick_interval,
            paused_rx,
            tick_tx,
            cancel.clone(),
        ));
        self.countdown = Some(Countdown {
            paused: paused_tx,
            cancel,
            ticks: tick_rx,
        });
    }

    /// Run the armed countdown. Returns false when nothing is armed.
    pub fn start(&mut self) -> bool {
        match &self.countdown {
            Some(countdown) => {
                countdown.paused.send_replace(false);
                self.state.paused = false;
                true
            }
            None => false,
        }
    }

    /// Freeze the countdown; remaining time is kept.
    pub fn pause(&mut self) {
        if let Some(countdown) = &self.countdown {
            countdown.paused.send_replace(true);
        }
        self.state.paused = true;
    }

    /// Drop the countdown without arming a new one.
    pub fn halt(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel.cancel();
        }
        self.state.paused = true;
    }

    /// Clear the timer for an activity that has no countdown.
    pub fn hold(&mut self) {
        self.halt();
        self.state = TimerState {
            remaining_ms: 0,
            total_ms: 0,
            paused: true,
        };
    }

    /// Next sample of the armed countdown.
    ///
    /// Pending forever while nothing is armed, so it can sit in a `select!`
    /// next to other event sources. Cancel-safe.
    pub async fn next_event(&mut self) -> TimerEvent {
        let Some(countdown) = self.countdown.as_mut() else {
            return std::future::pending().await;
        };
        match countdown.ticks.recv().await {
            Some(remaining) => {
                self.state.remaining_ms = remaining;
                TimerEvent::Tick(remaining)
            }
            None => {
                self.countdown = None;
                self.state.remaining_ms = 0;
                TimerEvent::Exhausted
            }
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.halt();
    }
}

// ── Producer ─────────────────────────────────────────────────────────

async fn run_countdown(
    mut remaining_ms: u64,
    period: Duration,
    mut paused: watch::Receiver<bool>,
    ticks: mpsc::Sender<u64>,
    cancel: CancellationToken,
) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_sample: Option<Instant> = None;

    loop {
        if *paused.borrow_and_update() {
            if let Some(since) = last_sample.take() {
                remaining_ms = remaining_ms.saturating_sub(elapsed_ms(since, Instant::now()));
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
            continue;
        }

        if remaining_ms == 0 {
            return;
        }
        if last_sample.is_none() {
            last_sample = Some(Instant::now());
            interval.reset();
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = paused.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        if let Some(since) = last_sample.replace(now) {
            remaining_ms = remaining_ms.saturating_sub(elapsed_ms(since, now));
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = ticks.send(remaining_ms) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

fn elapsed_ms(since: Instant, now: Instant) -> u64 {
    u64::try_from(now.saturating_duration_since(since).as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(timer: &mut TimerEngine) -> Vec<u64> {
        let mut samples = Vec::new();
        loop {
            match timer.next_event().await {
                TimerEvent::Tick(ms) => samples.push(ms),
                TimerEvent::Exhausted => return samples,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_tick_interval_is_clamped() {
        let mut timer = TimerEngine::new(Duration::from_millis(u64::MAX));
        assert_eq!(timer.tick_interval(), MAX_TICK_INTERVAL);
        assert_eq!(TimerEngine::new(Duration::ZERO).tick_interval(), Duration::from_millis(1));

        timer.configure(1);
        assert!(timer.start());
        assert_eq!(drain(&mut timer).await, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_to_zero_then_exhausts() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        timer.configure(1);
        assert!(timer.start());

        let samples = drain(&mut timer).await;
        assert_eq!(samples.len(), 10);
        assert!(samples.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(samples.last(), Some(&0));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn configured_timer_waits_paused() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        timer.configure(1);
        assert!(timer.state().paused);

        let waited = time::timeout(Duration::from_secs(5), timer.next_event()).await;
        assert!(waited.is_err());
        assert_eq!(timer.state().remaining_ms, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_keeps_remaining_time() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        timer.configure(1);
        timer.start();
        for _ in 0..3 {
            timer.next_event().await;
        }
        assert_eq!(timer.state().remaining_ms, 700);

        timer.pause();
        let waited = time::timeout(Duration::from_secs(2), timer.next_event()).await;
        assert!(waited.is_err());
        assert_eq!(timer.state().remaining_ms, 700);

        timer.start();
        assert_eq!(timer.next_event().await, TimerEvent::Tick(600));
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_discards_stale_samples() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        timer.configure(10);
        timer.start();
        assert_eq!(timer.next_event().await, TimerEvent::Tick(9_900));

        timer.configure(1);
        assert_eq!(timer.state().total_ms, 1000);
        timer.start();
        assert_eq!(timer.next_event().await, TimerEvent::Tick(900));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_exhausts_once_started() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        timer.configure(0);
        timer.start();
        assert_eq!(timer.next_event().await, TimerEvent::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn unarmed_timer_never_yields() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        assert!(!timer.start());
        let waited = time::timeout(Duration::from_secs(60), timer.next_event()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn hold_clears_countdown() {
        let mut timer = TimerEngine::new(DEFAULT_TICK_INTERVAL);
        timer.configure(5);
        timer.start();
        timer.hold();
        assert!(!timer.is_armed());
        assert_eq!(
            timer.state(),
            TimerState {
                remaining_ms: 0,
                total_ms: 0,
                paused: true
            }
        );
    }
}
