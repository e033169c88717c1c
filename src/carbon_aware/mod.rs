//! Carbon-aware intensity overrides for tf-carbon
//!
//! This module turns a forecast carbon intensity series for one region into
//! a single average that takes precedence over the static region table.

pub mod forecast;
pub mod types;

pub use forecast::{aggregate_forecast, load_forecast, parse_forecast};
pub use types::{ForecastEntry, ForecastError, ForecastFile, ForecastOverride};
