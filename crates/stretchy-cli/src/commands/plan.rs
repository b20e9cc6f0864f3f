use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;
use stretchy_core::{Activity, ActivitySequence, RepositoryError, Result, TrainingStore};

use super::{clock, pick_training};

#[derive(Subcommand)]
pub enum PlanAction {
    /// List the trainings in a plan file
    List {
        /// Plan file (TOML)
        plan: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a training and print its pages
    Show {
        /// Plan file (TOML)
        plan: PathBuf,
        /// Training ID (defaults to the first training)
        #[arg(long)]
        training: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct PageOutput<'a> {
    page: usize,
    exercise: &'a Activity,
    rest: Option<&'a Activity>,
}

#[derive(Serialize)]
struct TrainingOutput<'a> {
    id: i64,
    name: &'a str,
    activities: usize,
    pages: Vec<PageOutput<'a>>,
}

pub fn run(action: PlanAction) -> Result<()> {
    match action {
        PlanAction::List { plan, json } => {
            let trainings = TrainingStore::with_path(plan).trainings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&trainings)?);
            } else {
                for training in &trainings {
                    println!(
                        "{}  {}  ({} activities)",
                        training.id,
                        training.name,
                        training.activities.len()
                    );
                }
            }
        }
        PlanAction::Show {
            plan,
            training,
            json,
        } => {
            let training = pick_training(&plan, training)?;
            let id = training.id;
            let sequence = ActivitySequence::new(training.activities.clone())
                .map_err(|source| RepositoryError::InvalidPlan { id, source })?;

            let pages: Vec<PageOutput> = sequence
                .pages()
                .iter()
                .filter_map(|(page, merged)| {
                    Some(PageOutput {
                        page: page.get(),
                        exercise: sequence.get(merged.exercise)?,
                        rest: merged.rest.and_then(|raw| sequence.get(raw)),
                    })
                })
                .collect();

            if json {
                let output = TrainingOutput {
                    id: id.0,
                    name: &training.name,
                    activities: sequence.len(),
                    pages,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "{} (#{}): {} pages, {} activities",
                    training.name,
                    id,
                    pages.len(),
                    sequence.len()
                );
                for page in &pages {
                    let rest = page
                        .rest
                        .map(|r| format!("  + break {}", clock(r.duration_ms())))
                        .unwrap_or_default();
                    println!(
                        "  {:>3}  {:<24} {}{}",
                        page.page,
                        page.exercise.name,
                        describe(page.exercise),
                        rest
                    );
                }
            }
        }
    }
    Ok(())
}

fn describe(activity: &Activity) -> String {
    if activity.activity_type.is_timed() {
        clock(activity.duration_ms())
    } else {
        "untimed".to_string()
    }
}
