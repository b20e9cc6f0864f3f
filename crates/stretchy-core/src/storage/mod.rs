mod config;
mod plans;

pub use config::{Config, CuesConfig, PlaybackConfig};
pub use plans::TrainingStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/stretchy[-dev]/` based on STRETCHY_ENV.
///
/// Set STRETCHY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STRETCHY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("stretchy-dev")
    } else {
        base_dir.join("stretchy")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
