//! Year-by-year population projection driven by a trained growth model.
//!
//! Starting from an entity's latest snapshot, each step predicts the growth
//! rate, applies it to the population, then drifts the time-varying
//! indicators: birth rate down, death rate up, GDP per capita up 2%.

use serde::Serialize;

use crate::data::{EntityRecord, FeatureInputs, normalize_features};
use crate::ml::ModelError;
use crate::ml::gbdt::GrowthModel;

const BIRTH_RATE_FLOOR: f64 = 5.0;
const BIRTH_RATE_STEP: f64 = 0.05;
const DEATH_RATE_CEILING: f64 = 20.0;
const DEATH_RATE_STEP: f64 = 0.03;
const GDP_GROWTH: f64 = 1.02;
const CONFIDENCE_START: f64 = 95.0;
const CONFIDENCE_DECAY: f64 = 0.3;
const CONFIDENCE_FLOOR: f64 = 60.0;

/// Starting state for a projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastBaseline {
    /// Period of the starting state; the first projected point is `period + 1`.
    pub period: i32,
    pub population: f64,
    /// Time-varying and static indicators at the start.
    pub inputs: FeatureInputs,
}

impl ForecastBaseline {
    /// Baseline from the entity's most recent snapshot, or `None` if it has no history.
    pub fn from_entity(entity: &EntityRecord) -> Option<Self> {
        let latest = entity.latest()?;
        Some(Self {
            period: latest.period,
            population: latest.population,
            inputs: FeatureInputs::from_snapshot(entity, latest),
        })
    }
}

/// One projected period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub period: i32,
    pub population: f64,
    /// Births over the period at the drifted birth rate (per 1000).
    pub births: f64,
    /// Deaths over the period at the drifted death rate (per 1000).
    pub deaths: f64,
    /// Growth in percent the model predicted for this step.
    pub predicted_growth: f64,
    /// Heuristic confidence in percent, decaying with horizon.
    pub confidence: f64,
}

/// Project `years` steps ahead from `baseline`.
///
/// Returns exactly `years` points for periods `baseline.period + 1` through
/// `baseline.period + years`; the baseline year itself is not repeated. So the
/// first point already carries one step of confidence decay (94.7%), not the
/// 95% of a step-zero point. Callers wanting the baseline year in the series
/// add it themselves.
pub fn build_forecast(
    model: &GrowthModel,
    baseline: &ForecastBaseline,
    years: u32,
) -> Result<Vec<ForecastPoint>, ModelError> {
    if !model.is_trained() {
        return Err(ModelError::Untrained);
    }
    let mut inputs = baseline.inputs;
    let mut population = baseline.population;
    let mut points = Vec::with_capacity(years as usize);
    for step in 1..=years {
        let predicted_growth = model.predict(&normalize_features(&inputs))?;
        population *= 1.0 + predicted_growth / 100.0;
        inputs.birth_rate = (inputs.birth_rate - BIRTH_RATE_STEP).max(BIRTH_RATE_FLOOR);
        inputs.death_rate = (inputs.death_rate + DEATH_RATE_STEP).min(DEATH_RATE_CEILING);
        inputs.gdp_per_capita *= GDP_GROWTH;
        points.push(ForecastPoint {
            period: baseline.period + step as i32,
            population,
            births: population * inputs.birth_rate / 1000.0,
            deaths: population * inputs.death_rate / 1000.0,
            predicted_growth,
            confidence: (CONFIDENCE_START - CONFIDENCE_DECAY * step as f64).max(CONFIDENCE_FLOOR),
        });
    }
    tracing::debug!(
        "Projected {} periods from {} (population {:.1})",
        points.len(),
        baseline.period,
        baseline.population
    );
    Ok(points)
}
