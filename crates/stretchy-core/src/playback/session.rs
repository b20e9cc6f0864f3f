//! Async driver for one playback session.
//!
//! [`PlaybackEngine::start`] spawns a single actor task that owns the state
//! machine and the timer. Everything reaches it as an event: user commands,
//! timer samples, finished restore debounces and the dispatcher's streams.
//! The rendering layer reads the current [`UiSnapshot`] from a watch
//! channel through the returned [`SessionHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use super::machine::{Directive, PlaybackStateMachine};
use super::options::PlaybackOptions;
use super::snapshot::{SessionSummary, UiSnapshot};
use crate::activity::DisplayPage;
use crate::notify::NotificationDispatcher;
use crate::repository::{Repository, TrainingId};
use crate::timer::{TimerEngine, TimerEvent};

const COMMAND_BUFFER: usize = 16;

#[derive(Debug)]
enum Command {
    ChangePage {
        destination: DisplayPage,
        is_user_skip: bool,
    },
    ToggleStartStop,
    FinishActivity,
    EndTraining {
        reply: oneshot::Sender<Option<SessionSummary>>,
    },
}

/// Builds sessions. One engine plays exactly one training.
pub struct PlaybackEngine {
    repository: Arc<dyn Repository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    options: PlaybackOptions,
}

impl PlaybackEngine {
    pub fn new(
        repository: Arc<dyn Repository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            options: PlaybackOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch `training_id` and start playing it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, training_id: TrainingId) -> SessionHandle {
        let session_id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(UiSnapshot::Loading);
        let cancel = CancellationToken::new();

        let actor = Session {
            machine: PlaybackStateMachine::new(self.options.thresholds, self.options.autostart),
            timer: TimerEngine::new(self.options.tick_interval),
            dispatcher: self.dispatcher,
            restores: JoinSet::new(),
            restore_delay: self.options.restore_delay,
            snapshots: snapshot_tx,
        };
        let span = info_span!("session", id = %session_id, training = %training_id);
        let task = tokio::spawn(
            actor
                .run(self.repository, training_id, command_rx, cancel.clone())
                .instrument(span),
        );

        SessionHandle {
            session_id,
            commands: command_tx,
            snapshots: snapshot_rx,
            cancel,
            task: Some(task),
        }
    }
}

/// Control surface of a running session. Dropping it cancels the session.
pub struct SessionHandle {
    session_id: Uuid,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<UiSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn snapshot(&self) -> UiSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiSnapshot> {
        self.snapshots.clone()
    }

    pub async fn change_page(&self, destination: DisplayPage, is_user_skip: bool) {
        self.send(Command::ChangePage {
            destination,
            is_user_skip,
        })
        .await;
    }

    pub async fn toggle_start_stop_timer(&self) {
        self.send(Command::ToggleStartStop).await;
    }

    /// Mark the current activity as done and move on.
    pub async fn finish_activity(&self) {
        self.send(Command::FinishActivity).await;
    }

    /// Force-terminate the session.
    ///
    /// Returns the summary, or `None` if the session ended in an error.
    /// Calling it again returns the same summary.
    pub async fn end_training(&self) -> Option<SessionSummary> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::EndTraining { reply }).await.is_ok() {
            if let Ok(summary) = response.await {
                return summary;
            }
        }
        self.snapshots.borrow().summary().cloned()
    }

    /// Wait for a terminal snapshot. If the session was cancelled first,
    /// returns the last snapshot it published.
    pub async fn wait_until_finished(&mut self) -> UiSnapshot {
        if let Ok(snapshot) = self.snapshots.wait_for(UiSnapshot::is_terminal).await {
            return snapshot.clone();
        }
        self.snapshots.borrow().clone()
    }

    /// Cancel the session and wait for its task to stop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    async fn send(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            debug!(session = %self.session_id, "session already stopped, command dropped");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Actor ────────────────────────────────────────────────────────────

struct Session {
    machine: PlaybackStateMachine,
    timer: TimerEngine,
    dispatcher: Arc<dyn NotificationDispatcher>,
    restores: JoinSet<DisplayPage>,
    restore_delay: Duration,
    snapshots: watch::Sender<UiSnapshot>,
}

impl Session {
    async fn run(
        mut self,
        repository: Arc<dyn Repository>,
        training_id: TrainingId,
        mut commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) {
        info!(tick_ms = self.timer.tick_interval().as_millis() as u64, "session started");

        let fetch = repository.get_training_with_activities_by_id(training_id);
        tokio::pin!(fetch);
        let loaded = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("session cancelled while loading");
                    return;
                }
                loaded = &mut fetch => break Some(loaded),
                command = commands.recv() => match command {
                    Some(command) => {
                        self.handle(command);
                        if self.machine.is_terminal() {
                            break None;
                        }
                    }
                    None => return,
                },
            }
        };
        if let Some(loaded) = loaded {
            let directives = self.machine.load(loaded);
            self.apply(directives);
        }

        let mut read_aloud = self.dispatcher.read_aloud();
        let mut sound = self.dispatcher.sound_state();
        self.machine
            .relay_read_aloud(read_aloud.borrow_and_update().clone());
        self.machine.relay_sound(*sound.borrow_and_update());
        self.publish();
        let mut read_aloud_open = true;
        let mut sound_open = true;

        while !self.machine.is_terminal() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("session cancelled");
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!("every handle dropped");
                        break;
                    }
                },
                event = self.timer.next_event() => {
                    let directives = match event {
                        TimerEvent::Tick(remaining_ms) => self.machine.on_tick(remaining_ms),
                        TimerEvent::Exhausted => self.machine.on_timer_exhausted(),
                    };
                    self.apply(directives);
                }
                Some(joined) = self.restores.join_next(), if !self.restores.is_empty() => {
                    if let Ok(page) = joined {
                        self.machine.restore_page(page);
                        self.publish();
                    }
                }
                changed = read_aloud.changed(), if read_aloud_open => {
                    if changed.is_ok() {
                        let name = read_aloud.borrow_and_update().clone();
                        self.machine.relay_read_aloud(name);
                        self.publish();
                    } else {
                        read_aloud_open = false;
                    }
                }
                changed = sound.changed(), if sound_open => {
                    if changed.is_ok() {
                        let state = *sound.borrow_and_update();
                        self.machine.relay_sound(state);
                        self.publish();
                    } else {
                        sound_open = false;
                    }
                }
            }
        }

        self.timer.halt();
        self.restores.abort_all();
        self.publish();
        info!(terminal = self.machine.is_terminal(), "session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::ChangePage {
                destination,
                is_user_skip,
            } => {
                let directives = self.machine.change_page(destination, is_user_skip);
                self.apply(directives);
            }
            Command::ToggleStartStop => {
                let directives = self.machine.toggle_start_stop_timer();
                self.apply(directives);
            }
            Command::FinishActivity => {
                let directives = self.machine.finish_activity();
                self.apply(directives);
            }
            Command::EndTraining { reply } => {
                let directives = self.machine.end_training();
                self.apply(directives);
                let _ = reply.send(self.machine.summary().cloned());
            }
        }
    }

    fn apply(&mut self, directives: Vec<Directive>) {
        for directive in directives {
            match directive {
                Directive::Dispatch(cue) => {
                    debug!(cue = cue.kind(), "dispatching cue");
                    self.dispatcher.notify_event(cue);
                }
                Directive::ArmTimer {
                    duration_secs,
                    running,
                } => {
                    self.timer.configure(duration_secs);
                    if running {
                        self.timer.start();
                    }
                }
                Directive::HoldTimer => self.timer.hold(),
                Directive::PauseTimer => self.timer.pause(),
                Directive::ResumeTimer => {
                    self.timer.start();
                }
                Directive::ScheduleRestore(page) => {
                    let delay = self.restore_delay;
                    self.restores.spawn(async move {
                        tokio::time::sleep(delay).await;
                        page
                    });
                }
                Directive::Stop => {
                    self.timer.halt();
                    self.restores.abort_all();
                    // Pick up the completion sound before the terminal snapshot goes out.
                    let sound = *self.dispatcher.sound_state().borrow();
                    self.machine.relay_sound(sound);
                }
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.machine.snapshot());
    }
}
