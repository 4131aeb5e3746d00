//! Feature extraction from entity histories.
//!
//! Every adjacent pair of snapshots yields one training example: the features
//! describe the earlier snapshot, the target is the percentage population
//! change to the later one. [`normalize_features`] is the only place the
//! normalization divisors live, so inference-time callers build vectors the
//! same way training did.

use std::collections::BTreeSet;

use super::{EntityMap, EntityRecord, Snapshot};
use crate::ml::ModelError;

/// Number of features produced per example.
pub const FEATURE_COUNT: usize = 9;

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "birth_rate",
    "death_rate",
    "gdp_per_capita",
    "urbanization",
    "education_index",
    "healthcare_spending",
    "fertility_rate",
    "median_age",
    "life_expectancy",
];

/// Raw, unnormalized indicators for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureInputs {
    pub birth_rate: f64,
    pub death_rate: f64,
    pub gdp_per_capita: f64,
    pub urbanization: f64,
    pub education_index: f64,
    pub healthcare_spending: f64,
    pub fertility_rate: f64,
    pub median_age: f64,
    pub life_expectancy: f64,
}

impl FeatureInputs {
    /// Combine a snapshot's time-varying indicators with the entity's static ones.
    pub fn from_snapshot(entity: &EntityRecord, snapshot: &Snapshot) -> Self {
        Self {
            birth_rate: snapshot.birth_rate,
            death_rate: snapshot.death_rate,
            gdp_per_capita: snapshot.gdp_per_capita,
            urbanization: entity.urbanization,
            education_index: entity.education_index,
            healthcare_spending: entity.healthcare_spending,
            fertility_rate: entity.fertility_rate,
            median_age: entity.median_age,
            life_expectancy: entity.life_expectancy,
        }
    }
}

/// Scale raw indicators into roughly `[0, 1]`.
///
/// Birth rate per 50, death rate per 20, GDP as `ln(gdp + 1) / 12`,
/// urbanization per 100, education index unchanged, healthcare spending per
/// 20, fertility per 8, median age and life expectancy per 100.
pub fn normalize_features(inputs: &FeatureInputs) -> [f64; FEATURE_COUNT] {
    [
        inputs.birth_rate / 50.0,
        inputs.death_rate / 20.0,
        (inputs.gdp_per_capita + 1.0).ln() / 12.0,
        inputs.urbanization / 100.0,
        inputs.education_index,
        inputs.healthcare_spending / 20.0,
        inputs.fertility_rate / 8.0,
        inputs.median_age / 100.0,
        inputs.life_expectancy / 100.0,
    ]
}

/// A single supervised example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    /// Normalized features, one per entry of the owning set's feature names.
    pub features: Vec<f64>,
    /// Growth in percent between this period and the next.
    pub target: f64,
    /// Entity key the example came from.
    pub source_id: String,
    /// Period of the earlier snapshot.
    pub period: i32,
}

/// Examples plus the feature names their vectors are laid out by.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub examples: Vec<TrainingExample>,
    pub feature_names: Vec<String>,
}

impl TrainingSet {
    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Targets in example order.
    pub fn targets(&self) -> Vec<f64> {
        self.examples.iter().map(|example| example.target).collect()
    }

    /// Check the set can be trained on: non-empty, consistent widths, finite values.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names.is_empty() {
            return Err(ModelError::insufficient("training set has no features"));
        }
        if self.examples.is_empty() {
            return Err(ModelError::insufficient("training set has no examples"));
        }
        let unique: BTreeSet<&str> = self.feature_names.iter().map(String::as_str).collect();
        if unique.len() != self.feature_names.len() {
            return Err(ModelError::insufficient("feature names must be unique"));
        }
        let expected = self.feature_names.len();
        for example in &self.examples {
            if example.features.len() != expected {
                return Err(ModelError::FeatureLength {
                    expected,
                    actual: example.features.len(),
                });
            }
            check_finite(example, &self.feature_names)?;
        }
        Ok(())
    }
}

/// Turn every entity's consecutive snapshots into training examples.
///
/// Fails when the map is empty, when any entity has fewer than two
/// snapshots, or when a value comes out non-finite (for example a zero
/// population in the earlier snapshot).
pub fn prepare_training_data(entities: &EntityMap) -> Result<TrainingSet, ModelError> {
    if entities.is_empty() {
        return Err(ModelError::insufficient("no entities supplied"));
    }
    let feature_names: Vec<String> = FEATURE_NAMES.iter().map(|name| name.to_string()).collect();
    let mut examples = Vec::new();
    for (source_id, entity) in entities {
        if entity.history.len() < 2 {
            return Err(ModelError::insufficient(format!(
                "entity {source_id} has {} snapshot(s), need at least 2",
                entity.history.len()
            )));
        }
        for pair in entity.history.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let example = TrainingExample {
                features: normalize_features(&FeatureInputs::from_snapshot(entity, current))
                    .to_vec(),
                target: (next.population - current.population) / current.population * 100.0,
                source_id: source_id.clone(),
                period: current.period,
            };
            check_finite(&example, &feature_names)?;
            examples.push(example);
        }
    }
    tracing::debug!(
        "Prepared {} examples from {} entities",
        examples.len(),
        entities.len()
    );
    Ok(TrainingSet {
        examples,
        feature_names,
    })
}

fn check_finite(example: &TrainingExample, feature_names: &[String]) -> Result<(), ModelError> {
    let non_finite = |what: &str| ModelError::NonFiniteValue {
        what: what.to_string(),
        source_id: example.source_id.clone(),
        period: example.period,
    };
    if !example.target.is_finite() {
        return Err(non_finite("target"));
    }
    for (value, name) in example.features.iter().zip(feature_names) {
        if !value.is_finite() {
            return Err(non_finite(name));
        }
    }
    Ok(())
}
