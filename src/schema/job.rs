//! Job file format: parameters plus the preprocessed image.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, IntensityGrid, StrategyParams};

/// A complete chord-selection job as read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub params: StrategyParams,
    pub image: IntensityGrid,
}

impl JobConfig {
    /// Load and validate a JSON job file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, JobConfigError> {
        let text = fs::read_to_string(path)?;
        let job: JobConfig = serde_json::from_str(&text)?;
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.image.validate()?;
        self.params.validate()
    }

    /// Small synthetic job used by `--example`.
    pub fn example() -> Self {
        let size = 64;
        let mut image = IntensityGrid::filled(size, size, 255);
        // Dark diagonal band
        for y in 0..size {
            for x in 0..size {
                if x.abs_diff(y) < 4 {
                    image.set(x, y, 40);
                }
            }
        }
        Self {
            params: StrategyParams {
                n_anchors: 36,
                n_strings: 40,
                margin: 2.0,
                seed: Some(42),
                ..Default::default()
            },
            image,
        }
    }
}

/// Job loading errors.
#[derive(Debug, thiserror::Error)]
pub enum JobConfigError {
    #[error("Failed to read job file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse job file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid job: {0}")]
    Invalid(#[from] ConfigError),
}
