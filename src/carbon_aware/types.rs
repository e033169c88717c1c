//! Types for forecast carbon intensity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Forecast document as produced by a carbon intensity provider
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ForecastFile {
    /// Region identifier the samples apply to (e.g., "europe-west9")
    pub region: String,
    /// Carbon intensity samples
    pub data: Vec<ForecastEntry>,
}

/// One carbon intensity sample
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ForecastEntry {
    /// Sample timestamp, RFC 3339
    pub timestamp: String,
    /// Carbon intensity in gCO2eq/kWh
    pub value: Decimal,
}

impl ForecastEntry {
    /// Parsed timestamp, if it is valid RFC 3339
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Averaged forecast intensity that replaces the static table for one region
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastOverride {
    /// Average carbon intensity in gCO2eq/Wh
    pub average_intensity: Decimal,
    /// Region the override applies to; matched exactly
    pub region: String,
}

impl ForecastOverride {
    /// Whether the override applies to a resource in `region`
    pub fn applies_to(&self, region: &str) -> bool {
        self.region == region
    }
}

/// Reasons a forecast cannot be used
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Forecast file could not be read
    #[error("failed to read forecast carbon intensity file: {0}")]
    Io(#[from] std::io::Error),

    /// Forecast document is malformed
    #[error("failed to parse forecast carbon intensity JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Forecast document has no samples
    #[error("forecast carbon intensity file is empty")]
    Empty,
}
