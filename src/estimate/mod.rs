//! Emission estimation and aggregation
//!
//! [`engine`] estimates one resource; this module folds the per-resource
//! results into an [`EstimationReport`].

pub mod engine;
#[cfg(test)]
mod estimate_test;
pub mod types;

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::warn;

use crate::carbon_aware::ForecastOverride;
use crate::config::EstimationConfig;
use crate::error::{Error, Result};
use crate::resources::{Provider, Resource, UnsupportedResource};

pub use engine::{
    carbon_intensity, estimate_supported_resource, estimate_watt_hour, EstimationContext,
};
pub use types::{
    EstimationInfo, EstimationReport, EstimationResource, EstimationTotal, InfoByProvider,
    IntensitySource,
};

/// Result of estimating one extracted resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Estimated(EstimationResource),
    Unsupported(UnsupportedResource),
}

/// Estimate a resource, passing unsupported ones through untouched
pub fn estimate_resource(resource: &Resource, ctx: &EstimationContext<'_>) -> Result<Outcome> {
    match resource {
        Resource::Compute(compute) => {
            estimate_supported_resource(compute, ctx).map(Outcome::Estimated)
        }
        Resource::Unsupported(unsupported) => {
            let id = &unsupported.identification;
            warn!(
                "Skipping unsupported resource {}: {}.{}",
                id.provider, id.resource_type, id.name
            );
            Ok(Outcome::Unsupported(unsupported.clone()))
        }
    }
}

/// Single accumulation point for per-resource outcomes
#[derive(Debug, Default)]
pub struct EstimationAccumulator {
    resources: Vec<EstimationResource>,
    unsupported: Vec<UnsupportedResource>,
    total: EstimationTotal,
}

impl EstimationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the totals; fails if a total overflows
    pub fn add(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Estimated(estimation) => {
                let count = Decimal::from(estimation.total_count);
                let overflow = || Error::Overflow {
                    address: estimation.address(),
                };
                let power = estimation
                    .power
                    .checked_mul(count)
                    .and_then(|p| self.total.power.checked_add(p))
                    .ok_or_else(overflow)?;
                let emissions = estimation
                    .carbon_emissions
                    .checked_mul(count)
                    .and_then(|e| self.total.carbon_emissions.checked_add(e))
                    .ok_or_else(overflow)?;
                let resources_count = self
                    .total
                    .resources_count
                    .checked_add(estimation.total_count)
                    .ok_or_else(overflow)?;

                self.total.power = power;
                self.total.carbon_emissions = emissions;
                self.total.resources_count = resources_count;
                self.resources.push(estimation);
            }
            Outcome::Unsupported(resource) => self.unsupported.push(resource),
        }
        Ok(())
    }

    /// Build the report; resources are ordered by address
    pub fn into_report(
        self,
        config: &EstimationConfig,
        forecast: Option<&ForecastOverride>,
    ) -> EstimationReport {
        let mut resources = self.resources;
        sort_estimations(&mut resources);
        let mut unsupported = self.unsupported;
        unsupported.sort_by_key(|r| r.identification.address());

        EstimationReport {
            info: report_info(config, forecast),
            resources,
            unsupported_resources: unsupported,
            total: self.total,
        }
    }
}

/// Estimate every resource and aggregate the results.
///
/// Stops at the first resource without a usable carbon intensity.
pub fn estimate_resources(
    resources: &[Resource],
    ctx: &EstimationContext<'_>,
) -> Result<EstimationReport> {
    let mut accumulator = EstimationAccumulator::new();
    for resource in resources {
        accumulator.add(estimate_resource(resource, ctx)?)?;
    }
    Ok(accumulator.into_report(ctx.config, ctx.forecast))
}

/// Sort estimations by resource address
pub fn sort_estimations(resources: &mut [EstimationResource]) {
    resources.sort_by_key(|r| r.address());
}

fn report_info(config: &EstimationConfig, forecast: Option<&ForecastOverride>) -> EstimationInfo {
    let info_by_provider: BTreeMap<String, InfoByProvider> = [Provider::Gcp, Provider::Aws]
        .iter()
        .map(|provider| {
            let usage = config.usage_for(provider);
            (
                provider.key().to_string(),
                InfoByProvider {
                    average_cpu_usage: usage.avg_cpu_use,
                    average_gpu_usage: usage.avg_gpu_use,
                },
            )
        })
        .collect();

    EstimationInfo {
        unit_time: config.unit.time.to_string(),
        unit_power: "W".to_string(),
        unit_carbon_emissions_time: format!("{}CO2eq/{}", config.unit.carbon, config.unit.time),
        date_time: Utc::now(),
        info_by_provider,
        forecast: forecast.cloned(),
    }
}
