//! Request orchestration shared by the HTTP API and the CLI.

pub mod event;
pub mod observed;
pub mod poe;

pub use event::{run_event, EventRequest, EventThresholds};
pub use observed::{score_observed, ObservedRequest, ObservedResponse};
pub use poe::{run_poe, MetricSpec, PoeMeta, PoeRequest, PoeResponse, Provenance};

use indexmap::IndexMap;

use crate::climo::Variable;

pub const APP_NAME: &str = "Will it Rain on My Parade? Climatology API";

pub const CLIMO_SOURCE_NOTE: &str =
    "Climatology from NASA POWER daily point series; probabilities pool every year within the day-of-year window.";

/// Unit label for every supported variable, in catalogue order.
pub fn variable_units() -> IndexMap<String, String> {
    Variable::ALL
        .iter()
        .map(|v| (v.name().to_string(), v.units().to_string()))
        .collect()
}
