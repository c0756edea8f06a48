use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use parade_climo::{
    climo::{RawDaily, RawRow},
    error::ClimoError,
    evs::{
        direct::{heat_subscore, humidity_subscore, rain_subscore, wind_subscore},
        expected::expected_subscore,
        AdverseThresholds, ClimatologyComposer, CompositionStrategy, DirectObservationMapper,
        FactorWeights, Observation, ScoreInput, Subscores, WeightOverrides, NEUTRAL_SUBSCORE,
    },
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Two mild dry years with no wind reports at all.
fn calm_record() -> RawDaily {
    (0..730)
        .map(|k| {
            (
                date(2010, 1, 1) + Duration::days(k),
                RawRow {
                    tmax_c: Some(20.0),
                    tmin_c: Some(10.0),
                    tavg_c: Some(15.0),
                    rh: Some(50.0),
                    ws_ms: None,
                    pr_mm: Some(0.0),
                },
            )
        })
        .collect()
}

#[test]
fn composite_matches_worked_example() {
    let subscores = Subscores {
        rain: 80.0,
        wind: 60.0,
        heat: 90.0,
        humidity: 70.0,
    };
    let total = subscores.composite(&FactorWeights::climatology());
    assert!((total - 76.0).abs() < 1e-9, "got {total}");
}

#[test]
fn composite_is_clamped() {
    let heavy = FactorWeights {
        rain: 2.0,
        wind: 2.0,
        heat: 2.0,
        humidity: 2.0,
    };
    assert_eq!(Subscores::neutral().composite(&heavy), 100.0);
    let negative = FactorWeights {
        rain: -1.0,
        ..FactorWeights::climatology()
    };
    let low = Subscores {
        rain: 100.0,
        wind: 0.0,
        heat: 0.0,
        humidity: 0.0,
    };
    assert_eq!(low.composite(&negative), 0.0);
}

#[test]
fn expected_subscore_is_neutral_without_samples() {
    assert_eq!(expected_subscore(None), NEUTRAL_SUBSCORE);
    assert_eq!(expected_subscore(Some(0.25)), 75.0);
}

#[test]
fn composer_scores_a_calm_day() {
    let composer = ClimatologyComposer::new(7);
    let evs = composer.score(&calm_record(), date(2024, 5, 15));
    assert_eq!(evs.subscores.rain, 100.0);
    // wind never observed, so its pool is empty
    assert_eq!(evs.subscores.wind, NEUTRAL_SUBSCORE);
    assert_eq!(evs.subscores.heat, 100.0);
    assert_eq!(evs.subscores.humidity, 100.0);
    assert!((evs.total - 87.5).abs() < 1e-9, "got {}", evs.total);
}

#[test]
fn adverse_thresholds_change_the_outcome() {
    let strict = AdverseThresholds {
        rh_pct: 40.0,
        ..AdverseThresholds::default()
    };
    let composer = ClimatologyComposer::new(7).with_thresholds(strict);
    let evs = composer.score(&calm_record(), date(2024, 5, 15));
    assert_eq!(evs.subscores.humidity, 0.0);
}

#[test]
fn weight_overrides_keep_unset_defaults() {
    let overrides = WeightOverrides {
        rain: Some(0.5),
        ..WeightOverrides::default()
    };
    let weights = overrides.apply(FactorWeights::climatology());
    assert_eq!(weights.rain, 0.5);
    assert_eq!(weights.wind, 0.25);
    assert_eq!(weights.humidity, 0.15);
}

#[test]
fn piecewise_maps_follow_their_breakpoints() {
    assert_eq!(rain_subscore(0.2), 100.0);
    assert_eq!(rain_subscore(1.0), 40.0);
    assert_eq!(rain_subscore(5.0), 20.0);
    assert_eq!(rain_subscore(6.0), 0.0);
    assert_eq!(wind_subscore(10.0), 100.0);
    assert_eq!(wind_subscore(25.0), 30.0);
    assert_eq!(wind_subscore(40.0), 10.0);
    assert_eq!(heat_subscore(95.0), 70.0);
    assert_eq!(heat_subscore(101.0), 15.0);
    assert_eq!(humidity_subscore(30.0), 80.0);
    assert_eq!(humidity_subscore(40.0), 100.0);
    assert_eq!(humidity_subscore(80.0), 70.0);
    assert_eq!(humidity_subscore(95.0), 40.0);
}

#[test]
fn direct_mapper_uses_its_own_weights() {
    let mapper = DirectObservationMapper::default();
    let stormy = Observation {
        rain_mm_hr: 3.0,
        wind_mph: 22.0,
        heatindex_f: 97.0,
        rh_pct: 85.0,
    };
    let evs = mapper.score(&stormy);
    assert!((evs.total - 28.5).abs() < 1e-9, "got {}", evs.total);

    let pleasant = Observation {
        rain_mm_hr: 0.0,
        wind_mph: 5.0,
        heatindex_f: 80.0,
        rh_pct: 50.0,
    };
    assert!((mapper.score(&pleasant).total - 100.0).abs() < 1e-9);
}

#[test]
fn strategies_reject_foreign_inputs() {
    let observation = Observation {
        rain_mm_hr: 0.0,
        wind_mph: 0.0,
        heatindex_f: 70.0,
        rh_pct: 50.0,
    };
    let climatology = CompositionStrategy::Climatology(ClimatologyComposer::new(7));
    assert_eq!(climatology.name(), "climatology");
    assert!(matches!(
        climatology.score(ScoreInput::Observation(&observation)),
        Err(ClimoError::InvalidRequest(_))
    ));

    let direct = CompositionStrategy::DirectObservation(DirectObservationMapper::default());
    assert_eq!(direct.weights(), &FactorWeights::direct_observation());
    let raw = calm_record();
    assert!(direct
        .score(ScoreInput::Climatology {
            raw: &raw,
            day: date(2024, 5, 15),
        })
        .is_err());
    assert!(direct.score(ScoreInput::Observation(&observation)).is_ok());
}

proptest! {
    #[test]
    fn composite_stays_in_range_for_any_weights(
        scores in prop::array::uniform4(0.0f64..=100.0),
        weights in prop::array::uniform4(-5.0f64..5.0),
    ) {
        let subscores = Subscores {
            rain: scores[0],
            wind: scores[1],
            heat: scores[2],
            humidity: scores[3],
        };
        let weights = FactorWeights {
            rain: weights[0],
            wind: weights[1],
            heat: weights[2],
            humidity: weights[3],
        };
        let total = subscores.composite(&weights);
        prop_assert!((0.0..=100.0).contains(&total));
    }
}
