//! Piecewise subscores from directly observed conditions.

use serde::{Deserialize, Serialize};

use crate::evs::{Evs, FactorWeights, Subscores};

/// Instantaneous readings scored by the direct-observation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub rain_mm_hr: f64,
    pub wind_mph: f64,
    #[serde(rename = "heatindex_F")]
    pub heatindex_f: f64,
    pub rh_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectObservationMapper {
    pub weights: FactorWeights,
}

impl Default for DirectObservationMapper {
    fn default() -> Self {
        Self {
            weights: FactorWeights::direct_observation(),
        }
    }
}

impl DirectObservationMapper {
    pub fn with_weights(weights: FactorWeights) -> Self {
        Self { weights }
    }

    pub fn subscores(&self, observation: &Observation) -> Subscores {
        Subscores {
            rain: rain_subscore(observation.rain_mm_hr),
            wind: wind_subscore(observation.wind_mph),
            heat: heat_subscore(observation.heatindex_f),
            humidity: humidity_subscore(observation.rh_pct),
        }
    }

    pub fn score(&self, observation: &Observation) -> Evs {
        Evs::from_subscores(self.subscores(observation), &self.weights)
    }
}

pub fn rain_subscore(mm_hr: f64) -> f64 {
    match mm_hr {
        x if x <= 0.2 => 100.0,
        x if x <= 2.0 => 40.0,
        x if x <= 5.0 => 20.0,
        _ => 0.0,
    }
}

pub fn wind_subscore(mph: f64) -> f64 {
    match mph {
        x if x <= 10.0 => 100.0,
        x if x <= 20.0 => 60.0,
        x if x <= 25.0 => 30.0,
        _ => 10.0,
    }
}

pub fn heat_subscore(heat_index_f: f64) -> f64 {
    match heat_index_f {
        x if x <= 85.0 => 100.0,
        x if x <= 95.0 => 70.0,
        x if x <= 100.0 => 40.0,
        _ => 15.0,
    }
}

/// Comfortable band is 40–60 %; drier air scores slightly lower, muggier air much lower.
pub fn humidity_subscore(rh_pct: f64) -> f64 {
    match rh_pct {
        x if x < 40.0 => 80.0,
        x if x <= 60.0 => 100.0,
        x if x <= 80.0 => 70.0,
        _ => 40.0,
    }
}
