//! Normalized resource model
//!
//! Every provider-specific plan record is reduced to one of these shapes
//! before estimation. The estimation engine only ever sees
//! [`ComputeResource`]; records without an extraction rule become
//! [`UnsupportedResource`] and are carried through for reporting only.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cloud provider a resource belongs to
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    /// Google Cloud Platform
    Gcp,
    /// Amazon Web Services
    Aws,
    /// Any provider without coefficient data (azurerm, kubernetes, random, ...)
    Other(String),
}

impl Provider {
    /// Resolve a provider from a Terraform provider name.
    ///
    /// Accepts both short names (`google`) and registry addresses
    /// (`registry.terraform.io/hashicorp/google`).
    pub fn from_terraform_name(name: &str) -> Self {
        let short = name.rsplit('/').next().unwrap_or(name);
        match short {
            "google" | "google-beta" => Provider::Gcp,
            "aws" => Provider::Aws,
            other => Provider::Other(other.to_string()),
        }
    }

    /// Key used in configuration files and coefficient tables
    pub fn key(&self) -> &str {
        match self {
            Provider::Gcp => "gcp",
            Provider::Aws => "aws",
            Provider::Other(name) => name,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gcp => write!(f, "GCP"),
            Provider::Aws => write!(f, "AWS"),
            Provider::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Identity of one infrastructure item within a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentification {
    /// Module path (`module.db`), `None` for the root module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Name including its `count`/`for_each` index
    pub name: String,
    pub resource_type: String,
    pub provider: Provider,
    pub region: String,
    /// Number of identical instances (node pool size, ...)
    pub count: u32,
    /// Number of zones a storage resource is replicated across
    pub replication_factor: u32,
}

impl ResourceIdentification {
    /// `provider/[module.]type.name`, unique within a plan
    pub fn address(&self) -> String {
        match &self.module {
            Some(module) => format!(
                "{}/{}.{}.{}",
                self.provider.key(),
                module,
                self.resource_type,
                self.name
            ),
            None => format!(
                "{}/{}.{}",
                self.provider.key(),
                self.resource_type,
                self.name
            ),
        }
    }

    /// Number of physical copies the per-instance figures are multiplied by
    pub fn total_count(&self) -> u64 {
        u64::from(self.count) * u64::from(self.replication_factor)
    }
}

/// Normalized hardware shape of a resource
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResourceSpecs {
    pub vcpus: u32,
    pub memory_mb: u32,
    /// One entry per physical GPU
    pub gpu_types: Vec<String>,
    /// HDD storage in GB
    pub hdd_storage: Decimal,
    /// SSD storage in GB
    pub ssd_storage: Decimal,
    pub cpu_type: Option<String>,
    /// Assumed average CPU utilization (0..=1)
    pub average_cpu_usage: Decimal,
    /// Assumed average GPU utilization (0..=1)
    pub average_gpu_usage: Decimal,
}

/// A resource the estimation engine knows how to handle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResource {
    pub identification: ResourceIdentification,
    pub specs: ComputeResourceSpecs,
}

/// A resource without an extraction rule; reported but never estimated
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedResource {
    pub identification: ResourceIdentification,
}

/// Output of the extraction stage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Compute(ComputeResource),
    Unsupported(UnsupportedResource),
}

impl Resource {
    pub fn identification(&self) -> &ResourceIdentification {
        match self {
            Resource::Compute(r) => &r.identification,
            Resource::Unsupported(r) => &r.identification,
        }
    }

    pub fn address(&self) -> String {
        self.identification().address()
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Resource::Compute(_))
    }
}
