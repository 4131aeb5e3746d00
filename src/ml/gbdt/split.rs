//! Variance-reduction split search with per-node feature bagging.

use ordered_float::OrderedFloat;
use rand::Rng;
use rand::seq::index;

/// Best split found for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    pub feature_index: usize,
    /// Midpoint between two consecutive distinct values of the feature.
    pub threshold: f64,
    /// Weighted variance reduction achieved on the node's residuals.
    pub gain: f64,
}

/// Constraints the split search honors.
#[derive(Debug, Clone, Copy)]
pub struct SplitParams {
    /// Minimum rows required on each side of a split.
    pub min_samples_leaf: usize,
    /// Features sampled (without replacement) per call.
    pub features_per_node: usize,
}

/// Population variance (divides by `n`). Zero for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    let mut moments = Moments::default();
    for &value in values {
        moments.add(value);
    }
    moments.variance()
}

/// Find the split with the highest variance reduction over a random subset of features.
///
/// `rows[i]` is the feature vector whose residual is `residuals[i]`. Returns
/// `None` when no candidate leaves `min_samples_leaf` rows on both sides.
/// Ties keep the first candidate seen, in sampled-feature order and then
/// ascending threshold.
pub fn find_best_split<R: Rng + ?Sized>(
    rows: &[&[f64]],
    residuals: &[f64],
    params: &SplitParams,
    rng: &mut R,
) -> Option<SplitCandidate> {
    let num_features = rows.first()?.len();
    if num_features == 0 || rows.len() != residuals.len() {
        return None;
    }
    let amount = params.features_per_node.clamp(1, num_features);
    let sampled = index::sample(rng, num_features, amount).into_vec();

    let parent_variance = variance(residuals);
    let mut best: Option<SplitCandidate> = None;
    for feature_index in sampled {
        if let Some(candidate) =
            best_split_for_feature(rows, residuals, feature_index, parent_variance, params)
            && best.is_none_or(|current| candidate.gain > current.gain)
        {
            best = Some(candidate);
        }
    }
    best
}

/// Welford running moments; parent and child variances share this accumulator.
#[derive(Debug, Default, Clone, Copy)]
struct Moments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0)
    }
}

/// Sweep the sorted values of one feature, scoring every midpoint between
/// consecutive distinct values.
///
/// Rows left of the sweep position are exactly those with `value <= threshold`;
/// a midpoint that rounds onto the next value would break that and is skipped.
fn best_split_for_feature(
    rows: &[&[f64]],
    residuals: &[f64],
    feature_index: usize,
    parent_variance: f64,
    params: &SplitParams,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<(f64, f64)> = rows
        .iter()
        .zip(residuals)
        .map(|(row, &residual)| (row[feature_index], residual))
        .collect();
    sorted.sort_by_key(|&(value, _)| OrderedFloat(value));

    // suffix[i] holds the moments of sorted[i..].
    let mut suffix = vec![Moments::default(); sorted.len() + 1];
    for (idx, &(_, residual)) in sorted.iter().enumerate().rev() {
        suffix[idx] = suffix[idx + 1];
        suffix[idx].add(residual);
    }
    let n = sorted.len() as f64;

    let mut best: Option<SplitCandidate> = None;
    let mut left = Moments::default();
    for (idx, window) in sorted.windows(2).enumerate() {
        let (value, residual) = window[0];
        let next_value = window[1].0;
        left.add(residual);
        if OrderedFloat(value) == OrderedFloat(next_value) {
            continue;
        }
        let threshold = (value + next_value) / 2.0;
        if threshold >= next_value {
            continue;
        }
        let right = suffix[idx + 1];
        if left.count < params.min_samples_leaf || right.count < params.min_samples_leaf {
            continue;
        }
        let weighted = (left.count as f64 / n) * left.variance()
            + (right.count as f64 / n) * right.variance();
        let gain = parent_variance - weighted;
        if best.is_none_or(|current| gain > current.gain) {
            best = Some(SplitCandidate {
                feature_index,
                threshold,
                gain,
            });
        }
    }
    best
}
