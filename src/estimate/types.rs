//! Estimation results and report

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::carbon_aware::ForecastOverride;
use crate::resources::{ComputeResource, UnsupportedResource};

/// Where the carbon intensity applied to a resource came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensitySource {
    /// Averaged forecast for the resource's region
    Forecast,
    /// Static regional grid intensity table
    Static,
}

/// Estimated power and emissions of one resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationResource {
    pub resource: ComputeResource,
    /// Average power draw of one instance (W, i.e. Wh per hour)
    pub power: Decimal,
    /// Emissions of one instance per report time unit, in the report mass unit
    pub carbon_emissions: Decimal,
    pub average_cpu_usage: Decimal,
    /// Grid carbon intensity used (gCO2eq/Wh)
    pub carbon_intensity: Decimal,
    pub intensity_source: IntensitySource,
    /// `count × replication_factor`
    pub total_count: u64,
}

impl EstimationResource {
    pub fn address(&self) -> String {
        self.resource.identification.address()
    }
}

/// Count-weighted sums over supported resources
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationTotal {
    pub power: Decimal,
    pub carbon_emissions: Decimal,
    pub resources_count: u64,
}

/// Utilization assumptions reported for a provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoByProvider {
    pub average_cpu_usage: Decimal,
    pub average_gpu_usage: Decimal,
}

/// Report metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationInfo {
    pub unit_time: String,
    pub unit_power: String,
    pub unit_carbon_emissions_time: String,
    pub date_time: DateTime<Utc>,
    pub info_by_provider: BTreeMap<String, InfoByProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastOverride>,
}

/// Final output of the estimation pipeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationReport {
    pub info: EstimationInfo,
    pub resources: Vec<EstimationResource>,
    pub unsupported_resources: Vec<UnsupportedResource>,
    pub total: EstimationTotal,
}
