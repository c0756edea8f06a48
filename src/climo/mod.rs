//! Climatology probability-of-exceedance engine.

pub mod exceedance;
pub mod pool;
pub mod series;
pub mod variables;

pub use exceedance::{compute_generic_poe, BinSpec, Metric, Op, PoeBatch, PoeResult};
pub use pool::{pool, PoolingWindow};
pub use series::{DailySeries, RawDaily, RawRow};
pub use variables::Variable;
