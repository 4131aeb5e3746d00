//! Per-entity time-series records and their JSON loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod features;

pub use features::{
    FEATURE_COUNT, FEATURE_NAMES, FeatureInputs, TrainingExample, TrainingSet, normalize_features,
    prepare_training_data,
};

/// Entities keyed by a stable identifier. Ordered so extraction is deterministic.
pub type EntityMap = BTreeMap<String, EntityRecord>;

/// One dated observation in an entity's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Year (or other integer period) the observation belongs to.
    pub period: i32,
    /// Population-like quantity whose growth is the training target.
    pub population: f64,
    /// Births per 1000 people.
    pub birth_rate: f64,
    /// Deaths per 1000 people.
    pub death_rate: f64,
    /// GDP per capita in current USD.
    pub gdp_per_capita: f64,
}

/// Static attributes plus chronologically ordered history for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Display name.
    pub name: String,
    /// Urban population share in percent.
    pub urbanization: f64,
    /// Education index in `[0, 1]`.
    pub education_index: f64,
    /// Healthcare spending as percent of GDP.
    pub healthcare_spending: f64,
    /// Births per woman.
    pub fertility_rate: f64,
    /// Median age in years.
    pub median_age: f64,
    /// Life expectancy at birth in years.
    pub life_expectancy: f64,
    /// Snapshots ordered by ascending period.
    pub history: Vec<Snapshot>,
}

impl EntityRecord {
    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.last()
    }
}

/// Errors raised while loading entity records from disk.
#[derive(Debug, Error)]
pub enum DataError {
    /// Failed to read the input file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not a valid entity map.
    #[error("Invalid entity JSON at {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The bundled sample asset is not a valid entity map.
    #[error("Bundled sample data is corrupt: {0}")]
    Sample(#[source] serde_json::Error),
}

/// Load an entity map from a JSON object keyed by entity id.
pub fn load_entities_json(path: &Path) -> Result<EntityMap, DataError> {
    let bytes = std::fs::read(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entities: EntityMap =
        serde_json::from_slice(&bytes).map_err(|source| DataError::ParseJson {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Loaded {} entities from {}", entities.len(), path.display());
    Ok(entities)
}

/// Parse an entity map from a JSON string.
pub fn parse_entities_json(text: &str) -> Result<EntityMap, serde_json::Error> {
    serde_json::from_str(text)
}

/// The bundled five-country sample shipped in `assets/countries.json`.
pub fn sample_entities() -> Result<EntityMap, DataError> {
    const SAMPLE: &str = include_str!("../../assets/countries.json");
    parse_bundled(SAMPLE)
}

fn parse_bundled(text: &str) -> Result<EntityMap, DataError> {
    parse_entities_json(text).map_err(DataError::Sample)
}
