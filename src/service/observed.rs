//! Direct-observation EVS for a single set of readings.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ClimoError, Result},
    evs::{
        CompositionStrategy, DirectObservationMapper, Evs, FactorWeights, Observation, ScoreInput,
        WeightOverrides,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedRequest {
    #[serde(flatten)]
    pub observation: Observation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightOverrides>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedResponse {
    #[serde(flatten)]
    pub evs: Evs,
    pub strategy: String,
}

pub fn score_observed(request: &ObservedRequest) -> Result<ObservedResponse> {
    let obs = &request.observation;
    let readings = [obs.rain_mm_hr, obs.wind_mph, obs.heatindex_f, obs.rh_pct];
    if readings.iter().any(|v| !v.is_finite()) {
        return Err(ClimoError::InvalidRequest(
            "observations must be finite numbers".to_string(),
        ));
    }
    let weights = request
        .weights
        .unwrap_or_default()
        .apply(FactorWeights::direct_observation());
    let strategy =
        CompositionStrategy::DirectObservation(DirectObservationMapper::with_weights(weights));
    let evs = strategy.score(ScoreInput::Observation(obs))?;
    Ok(ObservedResponse {
        evs,
        strategy: strategy.name().to_string(),
    })
}
