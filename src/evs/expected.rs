//! Expected subscores from climatological probabilities of adverse weather.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    climo::{
        exceedance::exceedance_fraction, pool, DailySeries, Op, PoolingWindow, RawDaily, Variable,
    },
    evs::{Evs, FactorWeights, Subscores, NEUTRAL_SUBSCORE},
};

/// Levels at or above which a day counts as adverse for each factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdverseThresholds {
    pub rain_mm_day: f64,
    pub wind_mph: f64,
    #[serde(rename = "hi_F")]
    pub hi_f: f64,
    pub rh_pct: f64,
}

impl Default for AdverseThresholds {
    fn default() -> Self {
        Self {
            rain_mm_day: 10.0,
            wind_mph: 20.0,
            hi_f: 95.0,
            rh_pct: 80.0,
        }
    }
}

/// The four factor series derived once per point and reused for every day scored there.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSeries {
    pub rain: DailySeries,
    pub wind: DailySeries,
    pub heat: DailySeries,
    pub humidity: DailySeries,
}

impl FactorSeries {
    pub fn derive(raw: &RawDaily) -> Self {
        Self {
            rain: Variable::PrecipMmDay.derive(raw),
            wind: Variable::WindMph.derive(raw),
            heat: Variable::HeatIndexF.derive(raw),
            humidity: Variable::RhPct.derive(raw),
        }
    }
}

/// Climatology composer: `subscore = 100 * (1 - P(adverse))` per factor, weighted into a total.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimatologyComposer {
    pub thresholds: AdverseThresholds,
    pub weights: FactorWeights,
    pub half_width: u32,
}

impl ClimatologyComposer {
    pub fn new(half_width: u32) -> Self {
        Self {
            thresholds: AdverseThresholds::default(),
            weights: FactorWeights::climatology(),
            half_width,
        }
    }

    pub fn with_thresholds(mut self, thresholds: AdverseThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_weights(mut self, weights: FactorWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn score(&self, raw: &RawDaily, day: NaiveDate) -> Evs {
        self.score_day(&FactorSeries::derive(raw), day)
    }

    /// Score one day from pre-derived factor series.
    pub fn score_day(&self, series: &FactorSeries, day: NaiveDate) -> Evs {
        let window = PoolingWindow::new(day, self.half_width);
        let subscore = |factor: &DailySeries, threshold: f64| {
            expected_subscore(exceedance_fraction(&pool(factor, &window), threshold, Op::Ge))
        };
        let subscores = Subscores {
            rain: subscore(&series.rain, self.thresholds.rain_mm_day),
            wind: subscore(&series.wind, self.thresholds.wind_mph),
            heat: subscore(&series.heat, self.thresholds.hi_f),
            humidity: subscore(&series.humidity, self.thresholds.rh_pct),
        };
        Evs::from_subscores(subscores, &self.weights)
    }
}

/// Expected goodness given the chance of badness; no sample means neutral.
pub fn expected_subscore(adverse_probability: Option<f64>) -> f64 {
    adverse_probability.map_or(NEUTRAL_SUBSCORE, |p| 100.0 * (1.0 - p))
}
