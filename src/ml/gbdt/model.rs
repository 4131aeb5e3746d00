use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::node::Node;
use super::train::fit_ensemble;
use crate::config::BoostConfig;
use crate::data::{EntityMap, TrainingSet, prepare_training_data};
use crate::ml::ModelError;
use crate::ml::metrics::RegressionMetrics;

/// Snapshot format version written by [`GrowthModel::export_snapshot`].
pub const MODEL_VERSION: i64 = 1;

/// Gradient-boosted regression trees predicting percentage growth.
///
/// The model starts empty and untrained. A successful `train*` call replaces
/// its trees, importance counts and metrics wholesale; a failed call leaves
/// it empty and untrained.
#[derive(Debug, Clone, Default)]
pub struct GrowthModel {
    config: BoostConfig,
    feature_names: Vec<String>,
    trees: Vec<Node>,
    feature_importance: BTreeMap<String, usize>,
    metrics: RegressionMetrics,
    is_trained: bool,
}

/// Serializable structural dump of a [`GrowthModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Snapshot format version.
    pub model_version: i64,
    /// Feature names in vector order; fixes the expected input width.
    pub feature_names: Vec<String>,
    /// Trees in boosting-round order.
    pub trees: Vec<Node>,
    /// Config the model was trained with, including the learning rate.
    pub config: BoostConfig,
    /// Split counts per feature name.
    pub feature_importance: BTreeMap<String, usize>,
    /// Training-set metrics from the last run.
    pub training_metrics: RegressionMetrics,
    pub is_trained: bool,
}

impl GrowthModel {
    /// Create an untrained model after validating `config`.
    pub fn new(config: BoostConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &BoostConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.is_trained
    }

    /// Trees in boosting-round order.
    pub fn trees(&self) -> &[Node] {
        &self.trees
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of split nodes per feature across all trees.
    pub fn feature_importance(&self) -> &BTreeMap<String, usize> {
        &self.feature_importance
    }

    /// Metrics from the last successful training run.
    pub fn metrics(&self) -> &RegressionMetrics {
        &self.metrics
    }

    /// Extract examples from `entities` and train on them.
    pub fn train(&mut self, entities: &EntityMap) -> Result<RegressionMetrics, ModelError> {
        let set = prepare_training_data(entities)?;
        self.train_on(&set)
    }

    /// Train on a prepared set, seeding sampling from `config.seed` when present.
    pub fn train_on(&mut self, set: &TrainingSet) -> Result<RegressionMetrics, ModelError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.train_with_rng(set, &mut rng)
    }

    /// Train on a prepared set drawing all feature and row sampling from `rng`.
    pub fn train_with_rng<R: Rng + ?Sized>(
        &mut self,
        set: &TrainingSet,
        rng: &mut R,
    ) -> Result<RegressionMetrics, ModelError> {
        self.reset();
        let fitted = fit_ensemble(set, &self.config, rng)?;
        self.feature_names = set.feature_names.clone();
        self.trees = fitted.trees;
        self.feature_importance = fitted.feature_importance;
        self.metrics = fitted.metrics;
        self.is_trained = true;
        Ok(self.metrics)
    }

    /// Predicted growth in percent for one normalized feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if !self.is_trained {
            return Err(ModelError::Untrained);
        }
        if features.len() != self.feature_names.len() {
            return Err(ModelError::FeatureLength {
                expected: self.feature_names.len(),
                actual: features.len(),
            });
        }
        let learning_rate = self.config.learning_rate;
        Ok(self
            .trees
            .iter()
            .map(|tree| learning_rate * tree.output(features))
            .sum())
    }

    /// Copy the model into its serializable form.
    pub fn export_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            model_version: MODEL_VERSION,
            feature_names: self.feature_names.clone(),
            trees: self.trees.clone(),
            config: self.config.clone(),
            feature_importance: self.feature_importance.clone(),
            training_metrics: self.metrics,
            is_trained: self.is_trained,
        }
    }

    /// Replace this model with a validated snapshot. On error the model is unchanged.
    pub fn import_snapshot(&mut self, snapshot: ModelSnapshot) -> Result<(), ModelError> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }

    /// Build a model from a validated snapshot.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self, ModelError> {
        validate_snapshot(&snapshot)?;
        Ok(Self {
            config: snapshot.config,
            feature_names: snapshot.feature_names,
            trees: snapshot.trees,
            feature_importance: snapshot.feature_importance,
            metrics: snapshot.training_metrics,
            is_trained: snapshot.is_trained,
        })
    }

    /// Pretty-printed snapshot JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(&self.export_snapshot())?)
    }

    /// Parse and validate snapshot JSON.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    /// Write snapshot JSON to `path` atomically, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = serde_json::to_vec_pretty(&self.export_snapshot())?;
        let io_error = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_error)?;
        let mut temp = tempfile::Builder::new()
            .prefix("growth_model")
            .tempfile_in(dir)
            .map_err(io_error)?;
        temp.write_all(&bytes).map_err(io_error)?;
        temp.persist(path).map_err(|err| io_error(err.error))?;
        tracing::info!("Saved model with {} trees to {}", self.trees.len(), path.display());
        Ok(())
    }

    /// Read and validate snapshot JSON from `path`.
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_snapshot(serde_json::from_slice(&bytes)?)
    }

    fn reset(&mut self) {
        self.feature_names.clear();
        self.trees.clear();
        self.feature_importance.clear();
        self.metrics = RegressionMetrics::default();
        self.is_trained = false;
    }
}

fn validate_snapshot(snapshot: &ModelSnapshot) -> Result<(), ModelError> {
    if snapshot.model_version != MODEL_VERSION {
        return Err(ModelError::InvalidSnapshot(format!(
            "unsupported model_version {} (expected {MODEL_VERSION})",
            snapshot.model_version
        )));
    }
    snapshot.config.validate()?;
    if !snapshot.is_trained {
        if !snapshot.trees.is_empty() {
            return Err(ModelError::InvalidSnapshot(
                "untrained snapshot must not carry trees".to_string(),
            ));
        }
        return Ok(());
    }
    if snapshot.trees.is_empty() {
        return Err(ModelError::InvalidSnapshot(
            "trained snapshot has no trees".to_string(),
        ));
    }
    if snapshot.feature_names.is_empty() {
        return Err(ModelError::InvalidSnapshot(
            "trained snapshot has no feature names".to_string(),
        ));
    }
    let width = snapshot.feature_names.len();
    for (tree_idx, tree) in snapshot.trees.iter().enumerate() {
        check_node(tree, width).map_err(|reason| {
            ModelError::InvalidSnapshot(format!("tree {tree_idx}: {reason}"))
        })?;
    }
    Ok(())
}

fn check_node(node: &Node, width: usize) -> Result<(), String> {
    match node {
        Node::Leaf { value } if !value.is_finite() => Err(format!("leaf value {value}")),
        Node::Leaf { .. } => Ok(()),
        Node::Split {
            feature_index,
            threshold,
            left,
            right,
        } => {
            if *feature_index >= width {
                return Err(format!(
                    "feature index {feature_index} out of range for {width} features"
                ));
            }
            if !threshold.is_finite() {
                return Err(format!("threshold {threshold}"));
            }
            check_node(left, width)?;
            check_node(right, width)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrainingExample;
    use tempfile::tempdir;

    fn two_point_set(width: usize) -> TrainingSet {
        let mut low = vec![0.0; width];
        let mut high = vec![0.0; width];
        low[0] = 0.0;
        high[0] = 1.0;
        TrainingSet {
            examples: vec![
                TrainingExample {
                    features: low,
                    target: 10.0,
                    source_id: "a".to_string(),
                    period: 2000,
                },
                TrainingExample {
                    features: high,
                    target: 20.0,
                    source_id: "b".to_string(),
                    period: 2000,
                },
            ],
            feature_names: (0..width).map(|i| format!("f{i}")).collect(),
        }
    }

    fn stump_config() -> BoostConfig {
        BoostConfig {
            num_trees: 1,
            max_depth: 1,
            min_samples_leaf: 1,
            subsample_rate: 1.0,
            max_features: Some(9),
            seed: Some(1),
            ..BoostConfig::default()
        }
    }

    #[test]
    fn single_stump_splits_the_only_varying_feature() {
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();

        assert_eq!(
            model.trees(),
            &[Node::Split {
                feature_index: 0,
                threshold: 0.5,
                left: Box::new(Node::Leaf { value: 10.0 }),
                right: Box::new(Node::Leaf { value: 20.0 }),
            }]
        );
        let mut x = vec![0.0; 9];
        assert!((model.predict(&x).unwrap() - 1.0).abs() < 1e-12);
        x[0] = 1.0;
        assert!((model.predict(&x).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(model.feature_importance()["f0"], 1);
        assert_eq!(model.feature_importance()["f8"], 0);
    }

    #[test]
    fn predict_before_training_fails() {
        let model = GrowthModel::default();
        assert!(matches!(model.predict(&[0.0; 9]), Err(ModelError::Untrained)));
    }

    #[test]
    fn predict_checks_width() {
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();
        assert!(matches!(
            model.predict(&[0.0; 3]),
            Err(ModelError::FeatureLength {
                expected: 9,
                actual: 3
            })
        ));
    }

    #[test]
    fn failed_training_leaves_model_untrained() {
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();
        let empty = TrainingSet {
            examples: Vec::new(),
            feature_names: vec!["f0".to_string()],
        };
        assert!(model.train_on(&empty).is_err());
        assert!(!model.is_trained());
        assert!(model.trees().is_empty());
        assert!(matches!(model.predict(&[0.0]), Err(ModelError::Untrained)));
    }

    #[test]
    fn tiny_subsample_is_rejected() {
        let config = BoostConfig {
            subsample_rate: 0.4,
            ..stump_config()
        };
        let mut model = GrowthModel::new(config).unwrap();
        let err = model.train_on(&two_point_set(2)).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { .. }));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = BoostConfig {
            learning_rate: -1.0,
            ..BoostConfig::default()
        };
        assert!(matches!(
            GrowthModel::new(config),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn json_round_trip_preserves_predictions() {
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();
        let restored = GrowthModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(restored.export_snapshot(), model.export_snapshot());
        let x = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn save_and_load_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("growth.json");
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();
        model.save_json(&path).unwrap();
        let loaded = GrowthModel::load_json(&path).unwrap();
        assert_eq!(loaded.export_snapshot(), model.export_snapshot());
    }

    #[test]
    fn import_rejects_out_of_range_feature() {
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();
        let mut snapshot = model.export_snapshot();
        snapshot.feature_names.truncate(0);
        snapshot.feature_names.push("only".to_string());
        snapshot.trees[0] = Node::Split {
            feature_index: 4,
            threshold: 0.5,
            left: Box::new(Node::Leaf { value: 0.0 }),
            right: Box::new(Node::Leaf { value: 1.0 }),
        };
        let before = model.export_snapshot();
        let err = model.import_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSnapshot(_)));
        assert_eq!(model.export_snapshot(), before);
    }

    #[test]
    fn import_rejects_unknown_version_and_empty_trained() {
        let mut model = GrowthModel::new(stump_config()).unwrap();
        model.train_on(&two_point_set(9)).unwrap();

        let mut snapshot = model.export_snapshot();
        snapshot.model_version = 99;
        assert!(GrowthModel::from_snapshot(snapshot).is_err());

        let mut snapshot = model.export_snapshot();
        snapshot.trees.clear();
        assert!(GrowthModel::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn constant_target_model_round_trips_through_json() {
        let mut set = two_point_set(9);
        for example in &mut set.examples {
            example.target = 10.0;
        }
        let mut model = GrowthModel::new(stump_config()).unwrap();
        let metrics = model.train_on(&set).unwrap();
        assert_eq!(metrics.r2, f64::NEG_INFINITY);

        let json = model.to_json().unwrap();
        assert!(json.contains(r#""r2": "-inf""#), "{json}");
        let restored = GrowthModel::from_json(&json).unwrap();
        assert_eq!(restored.export_snapshot(), model.export_snapshot());
        assert_eq!(restored.metrics().r2, f64::NEG_INFINITY);
    }

    #[test]
    fn untrained_snapshot_imports_as_untrained() {
        let snapshot = GrowthModel::default().export_snapshot();
        assert!(!snapshot.is_trained);
        let model = GrowthModel::from_snapshot(snapshot).unwrap();
        assert!(!model.is_trained());
    }
}
