//! Per-resource power and emission estimation
//!
//! Power follows a linear model over the normalized specs:
//!
//! ```text
//! cpu     = vcpus × (cpu_min + avg_cpu × (cpu_max − cpu_min))
//! memory  = memory_gb × memory_wh_gb
//! storage = hdd_gb × hdd_wh_gb + ssd_gb × ssd_wh_gb
//! gpu     = Σ (gpu_min + avg_gpu × (gpu_max − gpu_min))
//! power   = (cpu + memory + storage + gpu) × pue
//! ```
//!
//! Emissions per hour are `power × intensity`, then scaled to the report
//! time unit and mass unit. Every figure is floored to 10 fractional digits.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::carbon_aware::ForecastOverride;
use crate::coefficients::{CoefficientProvider, EnergyCoefficients, StorageKind};
use crate::config::EstimationConfig;
use crate::error::{Error, Result};
use crate::estimate::types::{EstimationResource, IntensitySource};
use crate::resources::ComputeResource;
use crate::units::round_floor;

/// Collaborators of the estimation engine, shared by all resources of a run
#[derive(Clone, Copy)]
pub struct EstimationContext<'a> {
    pub config: &'a EstimationConfig,
    pub coefficients: &'a dyn CoefficientProvider,
    pub forecast: Option<&'a ForecastOverride>,
}

/// Average power draw of one instance in Wh per hour.
///
/// Fails only when a figure leaves the decimal range.
pub fn estimate_watt_hour(
    resource: &ComputeResource,
    coefficients: &dyn CoefficientProvider,
) -> Result<Decimal> {
    let provider = &resource.identification.provider;
    let Some(energy) = coefficients.energy_coefficients(provider) else {
        warn!(
            "No energy coefficients for provider {}, {} counted as 0 W",
            provider,
            resource.identification.address()
        );
        return Ok(Decimal::ZERO);
    };

    let cpu = estimate_watt_cpu(resource, &energy);
    let memory = estimate_watt_memory(resource, &energy);
    let storage = estimate_watt_storage(resource, &energy);
    let gpu = estimate_watt_gpu(resource, coefficients);

    debug!(
        "{}: cpu {:?} W + memory {:?} W + storage {:?} W + gpu {:?} W, PUE {}",
        resource.identification.address(),
        cpu,
        memory,
        storage,
        gpu,
        energy.pue_average
    );

    sum_with_pue([cpu, memory, storage, gpu], energy.pue_average)
        .ok_or_else(|| overflow(resource))
}

fn sum_with_pue(parts: [Option<Decimal>; 4], pue: Decimal) -> Option<Decimal> {
    let mut raw = Decimal::ZERO;
    for part in parts {
        raw = raw.checked_add(part?)?;
    }
    raw.checked_mul(pue).map(round_floor)
}

fn estimate_watt_cpu(resource: &ComputeResource, energy: &EnergyCoefficients) -> Option<Decimal> {
    let usage = resource.specs.average_cpu_usage;
    let per_vcpu = usage
        .checked_mul(energy.cpu_max_wh.checked_sub(energy.cpu_min_wh)?)?
        .checked_add(energy.cpu_min_wh)?;
    per_vcpu
        .checked_mul(Decimal::from(resource.specs.vcpus))
        .map(round_floor)
}

fn estimate_watt_memory(resource: &ComputeResource, energy: &EnergyCoefficients) -> Option<Decimal> {
    let memory_gb = Decimal::from(resource.specs.memory_mb) / Decimal::from(1024);
    memory_gb.checked_mul(energy.memory_wh_gb).map(round_floor)
}

fn estimate_watt_storage(resource: &ComputeResource, energy: &EnergyCoefficients) -> Option<Decimal> {
    let hdd = resource
        .specs
        .hdd_storage
        .checked_mul(energy.storage_wh_gb(StorageKind::Hdd))?;
    let ssd = resource
        .specs
        .ssd_storage
        .checked_mul(energy.storage_wh_gb(StorageKind::Ssd))?;
    hdd.checked_add(ssd).map(round_floor)
}

fn estimate_watt_gpu(resource: &ComputeResource, coefficients: &dyn CoefficientProvider) -> Option<Decimal> {
    let usage = resource.specs.average_gpu_usage;
    let mut total = Decimal::ZERO;
    for gpu_type in &resource.specs.gpu_types {
        let Some(gpu) = coefficients.gpu_coefficient(gpu_type) else {
            warn!(
                "Unknown GPU type '{}' on {}, counted as 0 W",
                gpu_type,
                resource.identification.address()
            );
            continue;
        };
        let watts = usage
            .checked_mul(gpu.max_watts.checked_sub(gpu.min_watts)?)?
            .checked_add(gpu.min_watts)?;
        total = total.checked_add(watts)?;
    }
    Some(round_floor(total))
}

fn overflow(resource: &ComputeResource) -> Error {
    Error::Overflow {
        address: resource.identification.address(),
    }
}

/// Carbon intensity (gCO2eq/Wh) for a resource.
///
/// A forecast wins when its region equals the resource's region; otherwise
/// the static table is used and a missing entry is fatal.
pub fn carbon_intensity(
    resource: &ComputeResource,
    ctx: &EstimationContext<'_>,
) -> Result<(Decimal, IntensitySource)> {
    let identification = &resource.identification;

    if let Some(forecast) = ctx.forecast.filter(|f| f.applies_to(&identification.region)) {
        info!(
            "Applying forecast carbon intensity {} gCO2eq/Wh for resource {} in region {}",
            forecast.average_intensity, identification.name, identification.region
        );
        return Ok((forecast.average_intensity, IntensitySource::Forecast));
    }

    let intensity = ctx
        .coefficients
        .region_intensity(&identification.provider, &identification.region)
        .ok_or_else(|| Error::MissingRegionIntensity {
            address: identification.address(),
            provider: identification.provider.to_string(),
            region: identification.region.clone(),
        })?;
    info!(
        "Using static carbon intensity {} gCO2eq/Wh for resource {} in region {}",
        intensity, identification.name, identification.region
    );
    Ok((intensity, IntensitySource::Static))
}

/// Estimate one supported resource. Figures are per instance.
pub fn estimate_supported_resource(
    resource: &ComputeResource,
    ctx: &EstimationContext<'_>,
) -> Result<EstimationResource> {
    let power = estimate_watt_hour(resource, ctx.coefficients)?;
    let (intensity, intensity_source) = carbon_intensity(resource, ctx)?;

    let unit = &ctx.config.unit;
    let per_hour = power
        .checked_mul(intensity)
        .map(round_floor)
        .ok_or_else(|| overflow(resource))?;
    let emissions = per_hour
        .checked_mul(unit.time.hours())
        .and_then(|scaled| scaled.checked_div(unit.carbon.divisor()))
        .map(round_floor)
        .ok_or_else(|| overflow(resource))?;

    debug!(
        "estimating resource {} ({}): {} Wh × {} gCO2eq/Wh = {} gCO2eq/h -> {} {}CO2eq/{}",
        resource.identification.address(),
        resource.identification.region,
        power,
        intensity,
        per_hour,
        emissions,
        unit.carbon,
        unit.time
    );

    Ok(EstimationResource {
        resource: resource.clone(),
        power,
        carbon_emissions: emissions,
        average_cpu_usage: round_floor(resource.specs.average_cpu_usage),
        carbon_intensity: intensity,
        intensity_source,
        total_count: resource.identification.total_count(),
    })
}
