//! Event viability score (EVS): four factor subscores combined into one 0–100 score.
//!
//! Two composition strategies exist and are kept apart on purpose: the climatology composer
//! turns historical exceedance probabilities into expected subscores, the direct-observation
//! mapper turns instantaneous readings into piecewise subscores. Each has its own default
//! weights.

pub mod direct;
pub mod expected;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{climo::RawDaily, error::ClimoError};

pub use direct::{DirectObservationMapper, Observation};
pub use expected::{AdverseThresholds, ClimatologyComposer, FactorSeries};

/// Subscore used for a factor with no historical sample.
pub const NEUTRAL_SUBSCORE: f64 = 50.0;

/// Per-factor subscores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub rain: f64,
    pub wind: f64,
    pub heat: f64,
    pub humidity: f64,
}

impl Subscores {
    pub fn neutral() -> Self {
        Self {
            rain: NEUTRAL_SUBSCORE,
            wind: NEUTRAL_SUBSCORE,
            heat: NEUTRAL_SUBSCORE,
            humidity: NEUTRAL_SUBSCORE,
        }
    }

    /// Weighted sum of the subscores, clamped to [0, 100] whatever the weights.
    pub fn composite(&self, weights: &FactorWeights) -> f64 {
        let total = self.rain * weights.rain
            + self.wind * weights.wind
            + self.heat * weights.heat
            + self.humidity * weights.humidity;
        if total.is_nan() {
            return 0.0;
        }
        total.clamp(0.0, 100.0)
    }
}

/// Factor weights for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub rain: f64,
    pub wind: f64,
    pub heat: f64,
    pub humidity: f64,
}

impl FactorWeights {
    /// Defaults of the climatology composer.
    pub const fn climatology() -> Self {
        Self {
            rain: 0.35,
            wind: 0.25,
            heat: 0.25,
            humidity: 0.15,
        }
    }

    /// Defaults of the direct-observation mapper.
    pub const fn direct_observation() -> Self {
        Self {
            rain: 0.45,
            wind: 0.25,
            heat: 0.20,
            humidity: 0.10,
        }
    }
}

/// Partial weight configuration; absent keys keep the strategy's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    pub rain: Option<f64>,
    pub wind: Option<f64>,
    pub heat: Option<f64>,
    pub humidity: Option<f64>,
}

impl WeightOverrides {
    pub fn apply(&self, base: FactorWeights) -> FactorWeights {
        FactorWeights {
            rain: self.rain.unwrap_or(base.rain),
            wind: self.wind.unwrap_or(base.wind),
            heat: self.heat.unwrap_or(base.heat),
            humidity: self.humidity.unwrap_or(base.humidity),
        }
    }
}

/// Composite score plus the subscores behind it, for one point on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evs {
    pub total: f64,
    #[serde(flatten)]
    pub subscores: Subscores,
}

impl Evs {
    pub fn from_subscores(subscores: Subscores, weights: &FactorWeights) -> Self {
        Self {
            total: subscores.composite(weights),
            subscores,
        }
    }
}

/// What a strategy scores.
#[derive(Debug, Clone, Copy)]
pub enum ScoreInput<'a> {
    Climatology { raw: &'a RawDaily, day: NaiveDate },
    Observation(&'a Observation),
}

/// The two independently configured ways of producing an EVS.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionStrategy {
    Climatology(ClimatologyComposer),
    DirectObservation(DirectObservationMapper),
}

impl CompositionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Climatology(_) => "climatology",
            Self::DirectObservation(_) => "direct_observation",
        }
    }

    pub fn weights(&self) -> &FactorWeights {
        match self {
            Self::Climatology(composer) => &composer.weights,
            Self::DirectObservation(mapper) => &mapper.weights,
        }
    }

    /// Score the input with this strategy; an input meant for the other strategy is rejected.
    pub fn score(&self, input: ScoreInput<'_>) -> Result<Evs, ClimoError> {
        match (self, input) {
            (Self::Climatology(composer), ScoreInput::Climatology { raw, day }) => {
                Ok(composer.score(raw, day))
            }
            (Self::DirectObservation(mapper), ScoreInput::Observation(observation)) => {
                Ok(mapper.score(observation))
            }
            (strategy, _) => Err(ClimoError::InvalidRequest(format!(
                "input does not match the {} strategy",
                strategy.name()
            ))),
        }
    }
}
