//! Forecast carbon intensity aggregation
//!
//! A forecast is reduced to one scalar: the unweighted arithmetic mean of its
//! samples. Samples are not weighted by the interval they cover and gaps are
//! not interpolated, so a non-uniformly sampled series is averaged as if it
//! were uniform.

use std::path::Path;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::carbon_aware::types::{ForecastError, ForecastFile, ForecastOverride};
use crate::units::round_floor;

/// Convert a forecast document into an override.
///
/// Sample values are gCO2eq/kWh; the override is expressed in gCO2eq/Wh.
pub fn aggregate_forecast(forecast: &ForecastFile) -> Result<ForecastOverride, ForecastError> {
    if forecast.data.is_empty() {
        return Err(ForecastError::Empty);
    }

    let kilo = Decimal::from(1000);
    let sum: Decimal = forecast.data.iter().map(|entry| entry.value / kilo).sum();
    let average = round_floor(sum / Decimal::from(forecast.data.len()));

    log_forecast_window(forecast);
    info!(
        "Computed average forecast carbon intensity: {} gCO2eq/Wh for region {}",
        average, forecast.region
    );

    Ok(ForecastOverride {
        average_intensity: average,
        region: forecast.region.clone(),
    })
}

/// Parse and aggregate a forecast JSON document
pub fn parse_forecast(content: &str) -> Result<ForecastOverride, ForecastError> {
    let forecast: ForecastFile = serde_json::from_str(content)?;
    aggregate_forecast(&forecast)
}

/// Read, parse and aggregate a forecast file
pub async fn load_forecast(path: &Path) -> Result<ForecastOverride, ForecastError> {
    info!(
        "Reading forecast carbon intensity from: {}",
        path.display()
    );
    let content = tokio::fs::read_to_string(path).await?;
    parse_forecast(&content)
}

fn log_forecast_window(forecast: &ForecastFile) {
    let mut timestamps = Vec::with_capacity(forecast.data.len());
    for entry in &forecast.data {
        match entry.parsed_timestamp() {
            Some(ts) => timestamps.push(ts),
            None => warn!("Failed to parse forecast timestamp '{}'", entry.timestamp),
        }
    }
    if let (Some(start), Some(end)) = (timestamps.iter().min(), timestamps.iter().max()) {
        info!(
            "Forecast for {} covers {} to {} ({} samples)",
            forecast.region,
            start.to_rfc3339(),
            end.to_rfc3339(),
            forecast.data.len()
        );
    }
}
