//! Resource extraction
//!
//! Maps raw plan records onto the normalized [`Resource`] model. Each
//! supported `(provider, resource type)` pair has a [`ResourceExtractor`]
//! strategy registered in an [`ExtractorRegistry`]; records without one
//! become [`Resource::Unsupported`].
//!
//! # Defaults
//!
//! Missing attributes never fail extraction:
//! - disks without a size are counted as [`DEFAULT_DISK_SIZE_GB`];
//! - unknown machine types contribute no vCPU or memory (logged);
//! - unknown disk types are classified by name (logged).

pub mod attrs;
pub mod aws;
pub mod gcp;

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::coefficients::{CoefficientProvider, StorageKind};
use crate::config::EstimationConfig;
use crate::plan::PlanResource;
use crate::resources::{
    ComputeResource, ComputeResourceSpecs, Provider, Resource, ResourceIdentification,
    UnsupportedResource,
};

use attrs::{get_blocks, get_str, get_u32, last_segment, region_from_attributes, Attributes};

/// Size assumed for a disk whose size is not in the plan
pub const DEFAULT_DISK_SIZE_GB: i64 = 50;

/// Largest accelerator count a single machine can carry
pub const MAX_GPUS_PER_BLOCK: u32 = 16;

/// Read-only collaborators available to every extractor
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    pub coefficients: &'a dyn CoefficientProvider,
    pub config: &'a EstimationConfig,
}

/// What an extractor derives from one record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    /// Region, when the rule knows better than the generic attribute lookup
    pub region: Option<String>,
    pub count: u32,
    pub replication_factor: u32,
    pub specs: ComputeResourceSpecs,
}

impl Extraction {
    /// Single, unreplicated resource
    pub fn single(specs: ComputeResourceSpecs) -> Self {
        Self {
            region: None,
            count: 1,
            replication_factor: 1,
            specs,
        }
    }
}

/// Extraction strategy for one resource type
pub trait ResourceExtractor: Send + Sync {
    fn extract(&self, provider: &Provider, values: &Attributes, ctx: &ExtractContext<'_>)
        -> Extraction;
}

/// `(provider, resource type) -> strategy` dispatch table
pub struct ExtractorRegistry {
    extractors: HashMap<(Provider, String), Box<dyn ResourceExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ExtractorRegistry {
    /// Registry without any rules; every record is unsupported
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry with the built-in GCP and AWS rules
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        gcp::register(&mut registry);
        aws::register(&mut registry);
        registry
    }

    pub fn register<E>(&mut self, provider: Provider, resource_type: impl Into<String>, extractor: E)
    where
        E: ResourceExtractor + 'static,
    {
        self.extractors
            .insert((provider, resource_type.into()), Box::new(extractor));
    }

    pub fn is_registered(&self, provider: &Provider, resource_type: &str) -> bool {
        self.extractors
            .contains_key(&(provider.clone(), resource_type.to_string()))
    }

    /// Normalize one plan record
    pub fn extract(&self, record: &PlanResource, ctx: &ExtractContext<'_>) -> Resource {
        let provider = Provider::from_terraform_name(&record.provider_name);
        let fallback_region = region_from_attributes(&provider, &record.values)
            .or_else(|| record.default_region.clone())
            .unwrap_or_default();

        let key = (provider.clone(), record.resource_type.clone());
        let Some(extractor) = self.extractors.get(&key) else {
            debug!(
                "No extraction rule for {} {}, marking unsupported",
                provider, record.resource_type
            );
            return Resource::Unsupported(UnsupportedResource {
                identification: ResourceIdentification {
                    module: record.module_path(),
                    name: record.indexed_name(),
                    resource_type: record.resource_type.clone(),
                    provider,
                    region: fallback_region,
                    count: 1,
                    replication_factor: 1,
                },
            });
        };

        let extraction = extractor.extract(&provider, &record.values, ctx);
        let identification = ResourceIdentification {
            module: record.module_path(),
            name: record.indexed_name(),
            resource_type: record.resource_type.clone(),
            provider,
            region: extraction.region.unwrap_or(fallback_region),
            count: extraction.count,
            replication_factor: extraction.replication_factor,
        };
        debug!(
            "Extracted {}: {:?} x{} (replication {})",
            identification.address(),
            extraction.specs,
            identification.count,
            identification.replication_factor
        );
        Resource::Compute(ComputeResource {
            identification,
            specs: extraction.specs,
        })
    }

    /// Normalize every record of a plan, preserving order
    pub fn extract_all(&self, records: &[PlanResource], ctx: &ExtractContext<'_>) -> Vec<Resource> {
        records.iter().map(|r| self.extract(r, ctx)).collect()
    }
}

// ---------------------------------------------------------------------------
// Shared rules
// ---------------------------------------------------------------------------

/// Specs with the provider's utilization assumptions filled in
pub(crate) fn base_specs(provider: &Provider, ctx: &ExtractContext<'_>) -> ComputeResourceSpecs {
    let usage = ctx.config.usage_for(provider);
    ComputeResourceSpecs {
        average_cpu_usage: usage.avg_cpu_use,
        average_gpu_usage: usage.avg_gpu_use,
        ..Default::default()
    }
}

/// Fill vCPU, memory and default GPUs from a machine type
pub(crate) fn apply_machine_type(
    specs: &mut ComputeResourceSpecs,
    provider: &Provider,
    machine_type: Option<&str>,
    ctx: &ExtractContext<'_>,
) {
    let Some(machine_type) = machine_type.map(last_segment) else {
        return;
    };
    match ctx.coefficients.machine_specs(provider, machine_type) {
        Some(machine) => {
            specs.vcpus = machine.vcpus;
            specs.memory_mb = machine.memory_mb;
            specs.gpu_types = machine.gpus;
        }
        None => warn!(
            "Unknown {} machine type '{}', counting no CPU or memory",
            provider, machine_type
        ),
    }
}

/// Replace the machine type's GPUs with explicit accelerator blocks.
///
/// Each block's `count` expands into that many entries. Without any block
/// the machine type default is kept.
pub(crate) fn apply_accelerators(specs: &mut ComputeResourceSpecs, values: &Attributes, key: &str) {
    let blocks = get_blocks(values, key);
    if blocks.is_empty() {
        return;
    }
    let mut gpus = Vec::new();
    for block in blocks {
        let Some(gpu_type) = get_str(block, "type").map(last_segment) else {
            continue;
        };
        let mut count = get_u32(block, "count").unwrap_or(1);
        if count > MAX_GPUS_PER_BLOCK {
            warn!(
                "Accelerator block requests {} x {}, counting {}",
                count, gpu_type, MAX_GPUS_PER_BLOCK
            );
            count = MAX_GPUS_PER_BLOCK;
        }
        gpus.extend(std::iter::repeat(gpu_type.to_string()).take(count as usize));
    }
    specs.gpu_types = gpus;
}

/// Storage class of a disk type, guessed from its name when not in the tables
pub(crate) fn storage_kind(
    provider: &Provider,
    disk_type: &str,
    ctx: &ExtractContext<'_>,
) -> StorageKind {
    match ctx.coefficients.disk_coefficient(provider, disk_type) {
        Some(coefficient) => coefficient.kind,
        None => {
            let kind = StorageKind::guess(disk_type);
            warn!(
                "Unknown {} disk type '{}', assuming {:?}",
                provider, disk_type, kind
            );
            kind
        }
    }
}

/// Attribute `size_gb` (or the default size) of a disk to its storage class
pub(crate) fn add_disk(
    specs: &mut ComputeResourceSpecs,
    provider: &Provider,
    disk_type: &str,
    size_gb: Option<Decimal>,
    ctx: &ExtractContext<'_>,
) {
    let size = size_gb.unwrap_or_else(|| Decimal::from(DEFAULT_DISK_SIZE_GB));
    match storage_kind(provider, disk_type, ctx) {
        StorageKind::Hdd => specs.hdd_storage += size,
        StorageKind::Ssd => specs.ssd_storage += size,
    }
}
