use popgrowth::config::BoostConfig;
use popgrowth::data::{TrainingExample, TrainingSet};
use popgrowth::ml::gbdt::Node;

/// Default config with a fixed seed.
pub fn seeded_config(seed: u64) -> BoostConfig {
    BoostConfig {
        seed: Some(seed),
        ..BoostConfig::default()
    }
}

/// Two examples that differ only in feature 0.
pub fn two_point_set() -> TrainingSet {
    let mut high = vec![0.0; 9];
    high[0] = 1.0;
    TrainingSet {
        examples: vec![
            example(vec![0.0; 9], 10.0, "low"),
            example(high, 20.0, "high"),
        ],
        feature_names: (0..9).map(|i| format!("f{i}")).collect(),
    }
}

/// Rows with varied features that all share one target value.
pub fn constant_target_set(target: f64) -> TrainingSet {
    let examples = (0..6)
        .map(|i| {
            let features = (0..9).map(|j| ((i * 3 + j) % 7) as f64 / 7.0).collect();
            example(features, target, &format!("row{i}"))
        })
        .collect();
    TrainingSet {
        examples,
        feature_names: (0..9).map(|i| format!("f{i}")).collect(),
    }
}

pub fn example(features: Vec<f64>, target: f64, source_id: &str) -> TrainingExample {
    TrainingExample {
        features,
        target,
        source_id: source_id.to_string(),
        period: 2000,
    }
}

/// Route `rows` through `node`, returning the smallest number of rows any
/// split sent to one side.
pub fn min_rows_per_split_side(node: &Node, rows: &[&[f64]]) -> Option<usize> {
    match node {
        Node::Leaf { .. } => None,
        Node::Split {
            feature_index,
            threshold,
            left,
            right,
        } => {
            let (l, r): (Vec<&[f64]>, Vec<&[f64]>) =
                rows.iter().copied().partition(|row| row[*feature_index] <= *threshold);
            let here = l.len().min(r.len());
            [
                Some(here),
                min_rows_per_split_side(left, &l),
                min_rows_per_split_side(right, &r),
            ]
            .into_iter()
            .flatten()
            .min()
        }
    }
}
