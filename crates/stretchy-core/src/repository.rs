//! Where trainings come from.
//!
//! The playback engine fetches one training per session through
//! [`Repository`] and never retries a failed lookup.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::error::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingId(pub i64);

impl fmt::Display for TrainingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A training plan together with its ordered activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Training {
    pub id: TrainingId,
    pub name: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_training_with_activities_by_id(
        &self,
        id: TrainingId,
    ) -> Result<Training, RepositoryError>;
}

/// HashMap-backed repository.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    trainings: HashMap<TrainingId, Training>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_training(mut self, training: Training) -> Self {
        self.insert(training);
        self
    }

    pub fn insert(&mut self, training: Training) {
        self.trainings.insert(training.id, training);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_training_with_activities_by_id(
        &self,
        id: TrainingId,
    ) -> Result<Training, RepositoryError> {
        self.trainings
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }
}
