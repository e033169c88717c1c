//! Coefficient table records

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default hardware shape of a machine type
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MachineSpecs {
    pub vcpus: u32,
    pub memory_mb: u32,
    /// GPUs bundled with the machine type, one entry per device
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpus: Vec<String>,
}

/// Idle and full-load power draw of one GPU
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GpuCoefficient {
    pub min_watts: Decimal,
    pub max_watts: Decimal,
}

/// Storage media class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Hdd,
    Ssd,
}

impl StorageKind {
    /// Classify an unknown disk type name
    pub fn guess(disk_type: &str) -> Self {
        if disk_type.to_lowercase().contains("ssd") {
            StorageKind::Ssd
        } else {
            StorageKind::Hdd
        }
    }
}

/// Storage class and power draw of a disk type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskCoefficient {
    pub kind: StorageKind,
    /// Watt-hours per GB per hour
    pub watt_hour_per_gb: Decimal,
}

/// Provider-wide power model coefficients
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnergyCoefficients {
    /// Watts per vCPU at idle
    pub cpu_min_wh: Decimal,
    /// Watts per vCPU at full load
    pub cpu_max_wh: Decimal,
    /// Watts per GB of memory
    pub memory_wh_gb: Decimal,
    /// Watts per TB of HDD storage
    pub storage_hdd_wh_tb: Decimal,
    /// Watts per TB of SSD storage
    pub storage_ssd_wh_tb: Decimal,
    /// Power usage effectiveness of the provider's data centers
    pub pue_average: Decimal,
}

impl EnergyCoefficients {
    /// Watts per GB for a storage class
    pub fn storage_wh_gb(&self, kind: StorageKind) -> Decimal {
        let per_tb = match kind {
            StorageKind::Hdd => self.storage_hdd_wh_tb,
            StorageKind::Ssd => self.storage_ssd_wh_tb,
        };
        per_tb / Decimal::from(1024)
    }
}

/// Grid carbon intensity of a region as published (gCO2eq/kWh)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionEmission {
    #[serde(default)]
    pub location: String,
    pub grid_carbon_intensity: Decimal,
}

/// All reference data used by the static coefficient provider.
///
/// Outer map keys are provider keys (`gcp`, `aws`) where the table is
/// provider specific.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoefficientTables {
    pub machine_types: HashMap<String, HashMap<String, MachineSpecs>>,
    pub gpu_watts: HashMap<String, GpuCoefficient>,
    pub disk_types: HashMap<String, HashMap<String, StorageKind>>,
    pub energy: HashMap<String, EnergyCoefficients>,
    pub region_intensity: HashMap<String, HashMap<String, RegionEmission>>,
}
