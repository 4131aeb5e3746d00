//! Evaluation metrics for regression models.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Training-set scores recorded at the end of a `train` call.
///
/// Scores are written to JSON as numbers when finite and as the strings
/// `"NaN"`, `"inf"` or `"-inf"` otherwise, so a degenerate R² survives a
/// save/load cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error.
    #[serde(serialize_with = "serialize_score", deserialize_with = "deserialize_score")]
    pub rmse: f64,
    /// Mean absolute error.
    #[serde(serialize_with = "serialize_score", deserialize_with = "deserialize_score")]
    pub mae: f64,
    /// Coefficient of determination. See [`r2`] for the constant-target case.
    #[serde(serialize_with = "serialize_score", deserialize_with = "deserialize_score")]
    pub r2: f64,
    /// Wall-clock duration of the training call.
    pub training_time_seconds: f64,
}

impl RegressionMetrics {
    /// Score `predictions` against `targets` in one pass over each metric.
    pub fn evaluate(targets: &[f64], predictions: &[f64], training_time_seconds: f64) -> Self {
        Self {
            rmse: rmse(targets, predictions),
            mae: mae(targets, predictions),
            r2: r2(targets, predictions),
            training_time_seconds,
        }
    }
}

/// `sqrt(mean((actual - predicted)²))`. `NaN` for empty input.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_of(actual, predicted, |diff| diff * diff).sqrt()
}

/// `mean(|actual - predicted|)`. `NaN` for empty input.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_of(actual, predicted, f64::abs)
}

/// `1 - SS_residual / SS_total`, with `SS_total` taken around the mean of `actual`.
///
/// A constant target makes `SS_total` zero. The result is then `NaN` when the
/// predictions are also exact and `-inf` otherwise; both cases are logged.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let ss_total: f64 = actual[..n].iter().map(|&a| (a - mean).powi(2)).sum();
    let ss_residual: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(&a, &p)| (a - p).powi(2))
        .sum();
    if ss_total == 0.0 {
        tracing::warn!(ss_residual, "Constant target; R² is undefined");
        return if ss_residual == 0.0 {
            f64::NAN
        } else {
            f64::NEG_INFINITY
        };
    }
    1.0 - ss_residual / ss_total
}

fn serialize_score<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        // `Display` yields "NaN", "inf" and "-inf", all of which `f64::from_str` accepts.
        serializer.serialize_str(&value.to_string())
    }
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| SerdeError::custom(format!("score {n} is not representable as f64"))),
        Value::String(text) => text
            .parse::<f64>()
            .map_err(|_| SerdeError::custom(format!("invalid score {text:?}"))),
        // Files written before scores were encoded as strings hold `null`.
        Value::Null => Ok(f64::NAN),
        other => Err(SerdeError::custom(format!(
            "expected a number or string score, got {other}"
        ))),
    }
}

fn mean_of(actual: &[f64], predicted: &[f64], loss: impl Fn(f64) -> f64) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(&a, &p)| loss(a - p))
        .sum();
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_score_zero_error_and_unit_r2() {
        let targets = [1.0, 2.5, -0.5, 4.0];
        let metrics = RegressionMetrics::evaluate(&targets, &targets, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn known_errors() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [2.0, 2.0, 3.0, 2.0];
        // Errors: -1, 0, 0, 2.
        assert!((mae(&actual, &predicted) - 0.75).abs() < 1e-12);
        assert!((rmse(&actual, &predicted) - (5.0f64 / 4.0).sqrt()).abs() < 1e-12);
        // SS_total = 5, SS_residual = 5.
        assert!(r2(&actual, &predicted).abs() < 1e-12);
    }

    #[test]
    fn mean_prediction_scores_zero_r2() {
        let actual = [1.0, 3.0];
        assert_eq!(r2(&actual, &[2.0, 2.0]), 0.0);
    }

    #[test]
    fn constant_target_r2_is_explicit() {
        let actual = [3.0, 3.0, 3.0];
        assert!(r2(&actual, &actual).is_nan());
        assert_eq!(r2(&actual, &[3.0, 3.0, 4.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn non_finite_scores_survive_json() {
        let metrics = RegressionMetrics {
            rmse: 0.5,
            mae: 0.25,
            r2: f64::NEG_INFINITY,
            training_time_seconds: 0.01,
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains(r#""r2":"-inf""#), "{json}");
        let restored: RegressionMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, metrics);

        let nan = RegressionMetrics {
            r2: f64::NAN,
            ..metrics
        };
        let restored: RegressionMetrics =
            serde_json::from_str(&serde_json::to_string(&nan).unwrap()).unwrap();
        assert!(restored.r2.is_nan());
        assert_eq!(restored.rmse, 0.5);
    }

    #[test]
    fn null_score_reads_as_nan_and_garbage_is_rejected() {
        let restored: RegressionMetrics = serde_json::from_str(
            r#"{"rmse":1.0,"mae":1.0,"r2":null,"training_time_seconds":0.0}"#,
        )
        .unwrap();
        assert!(restored.r2.is_nan());
        assert!(
            serde_json::from_str::<RegressionMetrics>(
                r#"{"rmse":1.0,"mae":1.0,"r2":"high","training_time_seconds":0.0}"#,
            )
            .is_err()
        );
    }

    #[test]
    fn empty_input_is_nan() {
        assert!(rmse(&[], &[]).is_nan());
        assert!(mae(&[], &[]).is_nan());
        assert!(r2(&[], &[]).is_nan());
    }
}
