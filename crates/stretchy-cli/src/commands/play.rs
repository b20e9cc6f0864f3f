use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Args;
use stretchy_core::{
    ActivityType, Config, CoreError, Cue, DisplayPage, NotificationDispatcher, PlaybackEngine,
    PlaybackOptions, Result, SoundState, TrainingId, TrainingStore, UiSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;

use super::{clock, pick_training};

#[derive(Args)]
pub struct PlayArgs {
    /// Plan file (TOML)
    plan: PathBuf,
    /// Training ID (defaults to the first training)
    #[arg(long)]
    training: Option<i64>,
    /// Countdown granularity in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Wait for `p` before the first countdown starts
    #[arg(long, conflicts_with = "unattended")]
    paused: bool,
    /// Play through without reading commands from stdin
    #[arg(long)]
    unattended: bool,
    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,
}

/// Prints cues to stderr and keeps the read-aloud and sound streams.
struct ConsoleDispatcher {
    current: Mutex<Option<ActivityType>>,
    read_aloud: watch::Sender<Option<String>>,
    sound: watch::Sender<SoundState>,
}

impl ConsoleDispatcher {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
            read_aloud: watch::Sender::new(None),
            sound: watch::Sender::new(SoundState::default()),
        }
    }
}

impl NotificationDispatcher for ConsoleDispatcher {
    fn notify_event(&self, cue: Cue) {
        match cue {
            Cue::ActivityUpdate {
                activity,
                next_name,
                ..
            } => {
                match next_name {
                    Some(next) => eprintln!("cue: {} (next: {next})", activity.name),
                    None => eprintln!("cue: {}", activity.name),
                }
                if let Ok(mut current) = self.current.lock() {
                    *current = Some(activity.activity_type);
                }
                if !activity.activity_type.is_break() {
                    self.read_aloud.send_replace(Some(activity.name));
                }
            }
            Cue::ActivityEnds { .. } => {
                let on_break = self
                    .current
                    .lock()
                    .ok()
                    .and_then(|c| *c)
                    .is_some_and(ActivityType::is_break);
                eprintln!("cue: {} ends soon", if on_break { "break" } else { "activity" });
                self.sound.send_modify(|s| {
                    if on_break {
                        s.break_ends += 1;
                    } else {
                        s.activity_finishes += 1;
                    }
                });
            }
            Cue::ActivitySwiped { .. } => eprintln!("cue: swiped"),
            Cue::TrainingCompleted { .. } => {
                eprintln!("cue: training completed");
                self.sound.send_modify(|s| s.training_completed += 1);
            }
        }
    }

    fn read_aloud(&self) -> watch::Receiver<Option<String>> {
        self.read_aloud.subscribe()
    }

    fn sound_state(&self) -> watch::Receiver<SoundState> {
        self.sound.subscribe()
    }
}

pub fn run(args: PlayArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(play(args))
}

async fn play(args: PlayArgs) -> Result<()> {
    let config = Config::load()?;
    let mut options = PlaybackOptions::from(&config);
    if let Some(ms) = args.tick_ms {
        options.tick_interval = Duration::from_millis(ms);
    }
    if args.paused {
        options.autostart = false;
    }
    let mut unattended = args.unattended;
    if unattended {
        options.autostart = true;
    }

    let training_id = match args.training {
        Some(id) => TrainingId(id),
        None => pick_training(&args.plan, None)?.id,
    };

    let dispatcher = Arc::new(ConsoleDispatcher::new());
    let engine = PlaybackEngine::new(Arc::new(TrainingStore::with_path(&args.plan)), dispatcher)
        .with_options(options);
    let mut handle = engine.start(training_id);
    tracing::debug!(
        session = %handle.session_id(),
        plan = %args.plan.display(),
        training = %training_id,
        "starting playback"
    );
    let mut snapshots = handle.subscribe();

    let mut input = if unattended {
        None
    } else {
        eprintln!("commands: p pause/resume, n next, b back, d done, q quit");
        Some(BufReader::new(tokio::io::stdin()).lines())
    };
    let mut shown: Option<(DisplayPage, String)> = None;
    let mut auto_finished: Option<DisplayPage> = None;
    let mut auto_resumed: Option<(DisplayPage, String)> = None;

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if snapshot.is_terminal() {
            break;
        }
        if let Some(view) = snapshot.activity() {
            let key = (view.page, view.name.clone());
            if shown.as_ref() != Some(&key) {
                if !args.json {
                    let next = view
                        .next_name
                        .as_deref()
                        .map(|n| format!("  (next: {n})"))
                        .unwrap_or_default();
                    let time = if view.activity_type.is_timed() {
                        clock(view.total_ms)
                    } else {
                        "untimed".to_string()
                    };
                    println!(
                        "[{}/{}] {}  {}{}",
                        view.page.get() + 1,
                        view.page_count,
                        view.name,
                        time,
                        next
                    );
                }
                shown = Some(key);
            }

            if unattended {
                let timeless = view.activity_type == ActivityType::TimelessExercise;
                if timeless && auto_finished != Some(view.page) {
                    auto_finished = Some(view.page);
                    handle.finish_activity().await;
                } else if !timeless && view.paused && auto_resumed.as_ref() != shown.as_ref() {
                    auto_resumed = shown.clone();
                    handle.toggle_start_stop_timer().await;
                }
            }
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = next_line(&mut input) => match line {
                Some(line) => {
                    let page = snapshot.activity().map(|v| v.page.get()).unwrap_or(0);
                    match line.trim() {
                        "p" => handle.toggle_start_stop_timer().await,
                        "n" => handle.change_page(DisplayPage::new(page + 1), true).await,
                        "b" => {
                            handle
                                .change_page(DisplayPage::new(page.saturating_sub(1)), true)
                                .await
                        }
                        "d" => handle.finish_activity().await,
                        "q" => {
                            handle.end_training().await;
                        }
                        "" => {}
                        other => eprintln!("unknown command: {other}"),
                    }
                }
                None => {
                    // stdin closed: keep playing on our own.
                    input = None;
                    unattended = true;
                }
            },
        }
    }

    let last = handle.wait_until_finished().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&last)?);
    }
    match last {
        UiSnapshot::Completed { summary, .. } => {
            if !args.json {
                println!(
                    "Training completed in {} ({} exercises)",
                    summary.elapsed_label(),
                    summary.exercise_count
                );
            }
            Ok(())
        }
        UiSnapshot::Error { message } => Err(CoreError::Playback(message)),
        _ => Err(CoreError::Playback("session stopped before completion".into())),
    }
}

async fn next_line(input: &mut Option<Lines<BufReader<Stdin>>>) -> Option<String> {
    match input {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}
