//! Climatology probability-of-exceedance engine and Event-Corridor viability scoring.

pub mod api;
pub mod cli;
pub mod climo;
pub mod config;
pub mod corridor;
pub mod data;
pub mod error;
pub mod evs;
pub mod logging;
pub mod service;

pub use error::{ClimoError, Result};
