//! Boosting hyperparameters and their TOML loading.
//!
//! `BoostConfig` is validated once, when a model is built or a file is
//! loaded; training code then trusts its fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::ml::ModelError;

/// Hyperparameters for gradient-boosted tree training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Number of boosting rounds, one tree per round.
    pub num_trees: usize,
    /// Scale applied to every tree output.
    pub learning_rate: f64,
    /// Maximum depth of a tree; the root sits at depth 0.
    pub max_depth: usize,
    /// Minimum rows on each side of a split, and the minimum rows a node needs
    /// before a split is attempted.
    pub min_samples_leaf: usize,
    /// Fraction of rows each tree is fit on.
    pub subsample_rate: f64,
    /// Features examined per node. `None` uses `floor(sqrt(num_features))`.
    pub max_features: Option<usize>,
    /// Seed for feature and row sampling. `None` draws a fresh seed per call.
    pub seed: Option<u64>,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            num_trees: 50,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 5,
            subsample_rate: 0.8,
            max_features: None,
            seed: None,
        }
    }
}

impl BoostConfig {
    /// Check that every field is inside its usable range.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_trees == 0 {
            return Err(ModelError::InvalidConfig(
                "num_trees must be at least 1".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ModelError::InvalidConfig(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if !(self.subsample_rate > 0.0 && self.subsample_rate <= 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "subsample_rate must be in (0, 1], got {}",
                self.subsample_rate
            )));
        }
        if self.max_features == Some(0) {
            return Err(ModelError::InvalidConfig(
                "max_features must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of features sampled per node for a dataset with `num_features` columns.
    pub fn features_per_node(&self, num_features: usize) -> usize {
        let wanted = self
            .max_features
            .unwrap_or_else(|| (num_features as f64).sqrt().floor() as usize);
        wanted.clamp(1, num_features.max(1))
    }

    /// Load and validate a config from a TOML file. Missing keys take defaults.
    pub fn load_toml(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Load `boost.toml` from the application root, falling back to defaults
    /// when the file does not exist.
    pub fn load_from_app_dir() -> Result<Self, ConfigError> {
        let path = app_dirs::config_file_path()?;
        if !path.is_file() {
            tracing::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_toml(&path)
    }

    /// Write the config as TOML, creating parent directories as needed.
    pub fn save_toml(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self).map_err(|source| ConfigError::SerializeToml {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Errors that may occur while loading or saving the boosting config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved.
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML serialization error.
        source: toml::ser::Error,
    },
    /// The file parsed but its values are out of range.
    #[error("Rejected config at {path}: {source}")]
    Invalid {
        /// TOML file path.
        path: PathBuf,
        /// Validation failure.
        source: ModelError,
    },
}
