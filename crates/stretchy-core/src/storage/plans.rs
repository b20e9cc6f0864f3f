//! Training plans stored as a TOML file.
//!
//! ```toml
//! [[trainings]]
//! id = 1
//! name = "Morning"
//!
//! [[trainings.activities]]
//! name = "Squats"
//! duration_secs = 30
//! activity_type = "exercise"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RepositoryError;
use crate::repository::{Repository, Training, TrainingId};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlanFile {
    #[serde(default)]
    trainings: Vec<Training>,
}

/// File-backed [`Repository`]. The file is re-read on every lookup.
#[derive(Debug, Clone)]
pub struct TrainingStore {
    path: PathBuf,
}

impl TrainingStore {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Every training in the file, in file order.
    pub fn trainings(&self) -> Result<Vec<Training>, RepositoryError> {
        read_plan_file(&self.path)
    }

    /// Write `trainings` to the file, replacing its contents.
    pub fn save(&self, trainings: &[Training]) -> Result<(), RepositoryError> {
        let file = PlanFile {
            trainings: trainings.to_vec(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|source| RepositoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_plan_file(path: &Path) -> Result<Vec<Training>, RepositoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| RepositoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: PlanFile = toml::from_str(&content)?;
    debug!(path = %path.display(), trainings = file.trainings.len(), "plan file read");
    Ok(file.trainings)
}

#[async_trait]
impl Repository for TrainingStore {
    async fn get_training_with_activities_by_id(
        &self,
        id: TrainingId,
    ) -> Result<Training, RepositoryError> {
        let path = self.path.clone();
        let trainings = tokio::task::spawn_blocking(move || read_plan_file(&path))
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))??;
        trainings
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(RepositoryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ActivitySequence, ActivityType};

    const PLAN: &str = r#"
[[trainings]]
id = 1
name = "Morning"

[[trainings.activities]]
name = "Squats"
duration_secs = 30
activity_type = "exercise"

[[trainings.activities]]
name = "Break"
duration_secs = 10
activity_type = "break"

[[trainings.activities]]
name = "Plank"
activity_type = "timeless_exercise"

[[trainings]]
id = 2
name = "Evening"

[[trainings.activities]]
name = "Neck"
duration_secs = 20
activity_type = "stretch"
"#;

    fn store_with(content: &str) -> (tempfile::TempDir, TrainingStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(&path, content).unwrap();
        (dir, TrainingStore::with_path(path))
    }

    #[test]
    fn parses_trainings_in_file_order() {
        let (_dir, store) = store_with(PLAN);
        let trainings = store.trainings().unwrap();
        assert_eq!(trainings.len(), 2);
        assert_eq!(trainings[0].name, "Morning");
        assert_eq!(trainings[0].activities[2].activity_type, ActivityType::TimelessExercise);
        assert_eq!(trainings[0].activities[2].duration_secs, 0);
    }

    #[tokio::test]
    async fn looks_up_training_by_id() {
        let (_dir, store) = store_with(PLAN);
        let training = store
            .get_training_with_activities_by_id(TrainingId(2))
            .await
            .unwrap();
        assert_eq!(training.activities, vec![Activity::stretch("Neck", 20)]);

        let err = store
            .get_training_with_activities_by_id(TrainingId(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(TrainingId(5))));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrainingStore::with_path(dir.path().join("absent.toml"));
        let err = store
            .get_training_with_activities_by_id(TrainingId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let (_dir, store) = store_with("[[trainings]]\nid = \"one\"\n");
        assert!(matches!(store.trainings(), Err(RepositoryError::Parse(_))));
    }

    #[test]
    fn negative_duration_loads_as_zero() {
        let (_dir, store) = store_with(
            r#"
[[trainings]]
id = 7
name = "Typo"

[[trainings.activities]]
name = "Squats"
duration_secs = -5
activity_type = "exercise"

[[trainings.activities]]
name = "Lunges"
duration_secs = 20
activity_type = "exercise"
"#,
        );
        let trainings = store.trainings().unwrap();
        assert_eq!(trainings[0].activities[0], Activity::exercise("Squats", 0));
        assert!(ActivitySequence::new(trainings[0].activities.clone()).is_ok());
    }

    #[test]
    fn save_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrainingStore::with_path(dir.path().join("plan.toml"));
        let training = Training {
            id: TrainingId(3),
            name: "Quick".into(),
            activities: vec![Activity::exercise("Jumps", 15), Activity::rest(5)],
        };
        store.save(std::slice::from_ref(&training)).unwrap();
        assert_eq!(store.trainings().unwrap(), vec![training]);
    }
}
