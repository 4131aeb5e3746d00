use std::collections::BTreeMap;
use std::time::Instant;

use rand::Rng;
use rand::seq::index;

use super::node::Node;
use super::tree::TreeBuilder;
use crate::config::BoostConfig;
use crate::data::TrainingSet;
use crate::ml::ModelError;
use crate::ml::metrics::{RegressionMetrics, rmse};

/// Rounds between progress log lines.
const PROGRESS_EVERY: usize = 10;

/// Everything a successful boosting run produces.
#[derive(Debug, Clone)]
pub(crate) struct FittedEnsemble {
    pub trees: Vec<Node>,
    pub feature_importance: BTreeMap<String, usize>,
    pub metrics: RegressionMetrics,
}

/// Run `config.num_trees` boosting rounds with squared-error loss.
///
/// Each round fits a tree to the current residuals on a row subsample and
/// then advances the running prediction of every example. Any error aborts
/// the whole run; nothing partial is returned.
pub(crate) fn fit_ensemble<R: Rng + ?Sized>(
    set: &TrainingSet,
    config: &BoostConfig,
    rng: &mut R,
) -> Result<FittedEnsemble, ModelError> {
    config.validate()?;
    set.validate()?;
    let started = Instant::now();

    let n = set.len();
    let subsample_size = (n as f64 * config.subsample_rate).floor() as usize;
    if subsample_size == 0 {
        return Err(ModelError::insufficient(format!(
            "subsample of {n} examples at rate {} is empty",
            config.subsample_rate
        )));
    }

    let rows: Vec<&[f64]> = set
        .examples
        .iter()
        .map(|example| example.features.as_slice())
        .collect();
    let targets = set.targets();
    let builder = TreeBuilder {
        max_depth: config.max_depth,
        min_samples_leaf: config.min_samples_leaf,
        features_per_node: config.features_per_node(set.feature_names.len()),
    };

    let mut predictions = vec![0.0f64; n];
    let mut feature_importance: BTreeMap<String, usize> = set
        .feature_names
        .iter()
        .map(|name| (name.clone(), 0))
        .collect();
    let mut trees = Vec::with_capacity(config.num_trees);

    tracing::info!(
        examples = n,
        features = set.feature_names.len(),
        num_trees = config.num_trees,
        "Starting gradient boosting"
    );
    for round in 0..config.num_trees {
        let residuals: Vec<f64> = targets
            .iter()
            .zip(&predictions)
            .map(|(target, prediction)| target - prediction)
            .collect();

        let sampled = index::sample(rng, n, subsample_size);
        let sub_rows: Vec<&[f64]> = sampled.iter().map(|idx| rows[idx]).collect();
        let sub_residuals: Vec<f64> = sampled.iter().map(|idx| residuals[idx]).collect();

        let tree = builder.build(&sub_rows, &sub_residuals, rng)?;
        for (prediction, row) in predictions.iter_mut().zip(&rows) {
            *prediction += config.learning_rate * tree.output(row);
        }
        tree.for_each_split(&mut |feature_index, _| {
            if let Some(count) = set
                .feature_names
                .get(feature_index)
                .and_then(|name| feature_importance.get_mut(name))
            {
                *count += 1;
            }
        });
        tracing::debug!(
            round = round + 1,
            splits = tree.split_count(),
            depth = tree.depth(),
            "Built tree"
        );
        trees.push(tree);

        if (round + 1) % PROGRESS_EVERY == 0 {
            tracing::info!(
                "Tree {}/{} - RMSE: {:.4}",
                round + 1,
                config.num_trees,
                rmse(&targets, &predictions)
            );
        }
    }

    let metrics =
        RegressionMetrics::evaluate(&targets, &predictions, started.elapsed().as_secs_f64());
    tracing::info!(
        rmse = metrics.rmse,
        mae = metrics.mae,
        r2 = metrics.r2,
        seconds = metrics.training_time_seconds,
        "Training complete"
    );
    Ok(FittedEnsemble {
        trees,
        feature_importance,
        metrics,
    })
}
