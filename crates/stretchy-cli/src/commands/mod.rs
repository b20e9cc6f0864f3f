pub mod config;
pub mod play;
pub mod plan;

use std::path::Path;

use stretchy_core::{RepositoryError, Result, Training, TrainingId, TrainingStore};

/// Training `id` from the plan at `path`, or its first training.
pub fn pick_training(path: &Path, id: Option<i64>) -> Result<Training> {
    let trainings = TrainingStore::with_path(path).trainings()?;
    let training = match id {
        Some(id) => trainings.into_iter().find(|t| t.id == TrainingId(id)),
        None => trainings.into_iter().next(),
    };
    let missing = match id {
        Some(id) => RepositoryError::NotFound(TrainingId(id)),
        None => RepositoryError::Unavailable(format!("no trainings in {}", path.display())),
    };
    Ok(training.ok_or(missing)?)
}

/// `m:ss`, rounding partial seconds up.
pub fn clock(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    format!("{}:{:02}", secs / 60, secs % 60)
}
