//! Coefficient lookup contract and its table-backed implementation

use std::path::Path;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::coefficients::types::{
    CoefficientTables, DiskCoefficient, EnergyCoefficients, GpuCoefficient, MachineSpecs,
};
use crate::error::{Error, Result};
use crate::resources::Provider;

pub const MACHINE_TYPES_FILE: &str = "machine_types.json";
pub const GPU_WATTS_FILE: &str = "gpu_watts.json";
pub const DISK_TYPES_FILE: &str = "disk_types.json";
pub const ENERGY_COEFFICIENTS_FILE: &str = "energy_coefficients.json";
pub const REGION_INTENSITY_FILE: &str = "region_intensity.json";

const EMBEDDED_MACHINE_TYPES: &str = include_str!("data/machine_types.json");
const EMBEDDED_GPU_WATTS: &str = include_str!("data/gpu_watts.json");
const EMBEDDED_DISK_TYPES: &str = include_str!("data/disk_types.json");
const EMBEDDED_ENERGY_COEFFICIENTS: &str = include_str!("data/energy_coefficients.json");
const EMBEDDED_REGION_INTENSITY: &str = include_str!("data/region_intensity.json");

/// Read-only reference data consulted by extraction and estimation.
///
/// All lookups are pure. `None` means the table has no entry; callers decide
/// whether that is a warning or fatal.
pub trait CoefficientProvider: Send + Sync {
    /// Default vCPU, memory and GPU shape of a machine type
    fn machine_specs(&self, provider: &Provider, machine_type: &str) -> Option<MachineSpecs>;

    /// Power draw range of a GPU model
    fn gpu_coefficient(&self, gpu_type: &str) -> Option<GpuCoefficient>;

    /// Storage class and per-GB power draw of a disk type
    fn disk_coefficient(&self, provider: &Provider, disk_type: &str) -> Option<DiskCoefficient>;

    /// Grid carbon intensity of a region in gCO2eq/Wh
    fn region_intensity(&self, provider: &Provider, region: &str) -> Option<Decimal>;

    /// Provider-wide CPU, memory, storage and PUE coefficients
    fn energy_coefficients(&self, provider: &Provider) -> Option<EnergyCoefficients>;
}

/// Coefficient provider backed by static tables
#[derive(Clone, Debug, Default)]
pub struct StaticCoefficients {
    tables: CoefficientTables,
}

impl StaticCoefficients {
    pub fn new(tables: CoefficientTables) -> Self {
        Self { tables }
    }

    /// Tables shipped with the crate
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(CoefficientTables {
            machine_types: parse_table(MACHINE_TYPES_FILE, EMBEDDED_MACHINE_TYPES)?,
            gpu_watts: parse_table(GPU_WATTS_FILE, EMBEDDED_GPU_WATTS)?,
            disk_types: parse_table(DISK_TYPES_FILE, EMBEDDED_DISK_TYPES)?,
            energy: parse_table(ENERGY_COEFFICIENTS_FILE, EMBEDDED_ENERGY_COEFFICIENTS)?,
            region_intensity: parse_table(REGION_INTENSITY_FILE, EMBEDDED_REGION_INTENSITY)?,
        }))
    }

    /// Load tables, preferring files found in `data_dir` over the embedded copies
    pub async fn load(data_dir: Option<&Path>) -> Result<Self> {
        Ok(Self::new(CoefficientTables {
            machine_types: load_table(data_dir, MACHINE_TYPES_FILE, EMBEDDED_MACHINE_TYPES)
                .await?,
            gpu_watts: load_table(data_dir, GPU_WATTS_FILE, EMBEDDED_GPU_WATTS).await?,
            disk_types: load_table(data_dir, DISK_TYPES_FILE, EMBEDDED_DISK_TYPES).await?,
            energy: load_table(data_dir, ENERGY_COEFFICIENTS_FILE, EMBEDDED_ENERGY_COEFFICIENTS)
                .await?,
            region_intensity: load_table(
                data_dir,
                REGION_INTENSITY_FILE,
                EMBEDDED_REGION_INTENSITY,
            )
            .await?,
        }))
    }

    pub fn tables(&self) -> &CoefficientTables {
        &self.tables
    }
}

impl CoefficientProvider for StaticCoefficients {
    fn machine_specs(&self, provider: &Provider, machine_type: &str) -> Option<MachineSpecs> {
        let listed = self
            .tables
            .machine_types
            .get(provider.key())
            .and_then(|types| types.get(machine_type))
            .cloned();
        match (listed, provider) {
            (Some(specs), _) => Some(specs),
            (None, Provider::Gcp) => parse_custom_machine_type(machine_type),
            (None, _) => None,
        }
    }

    fn gpu_coefficient(&self, gpu_type: &str) -> Option<GpuCoefficient> {
        self.tables.gpu_watts.get(gpu_type).cloned()
    }

    fn disk_coefficient(&self, provider: &Provider, disk_type: &str) -> Option<DiskCoefficient> {
        let kind = *self
            .tables
            .disk_types
            .get(provider.key())?
            .get(&disk_type.to_lowercase())?;
        let energy = self.tables.energy.get(provider.key())?;
        Some(DiskCoefficient {
            kind,
            watt_hour_per_gb: energy.storage_wh_gb(kind),
        })
    }

    fn region_intensity(&self, provider: &Provider, region: &str) -> Option<Decimal> {
        self.tables
            .region_intensity
            .get(provider.key())?
            .get(region)
            .map(|emission| emission.grid_carbon_intensity / Decimal::from(1000))
    }

    fn energy_coefficients(&self, provider: &Provider) -> Option<EnergyCoefficients> {
        self.tables.energy.get(provider.key()).cloned()
    }
}

/// Decode GCP custom machine types.
///
/// Handles `custom-<cpus>-<memory_mb>`, `<family>-custom-<cpus>-<memory_mb>`
/// (optionally suffixed with `-ext`) and Cloud SQL `db-custom-<cpus>-<memory_mb>`.
pub fn parse_custom_machine_type(machine_type: &str) -> Option<MachineSpecs> {
    let parts: Vec<&str> = machine_type.split('-').collect();
    let custom = parts.iter().position(|p| *p == "custom")?;
    let vcpus = parts.get(custom + 1)?.parse().ok()?;
    let memory_mb = parts.get(custom + 2)?.parse().ok()?;
    match parts.get(custom + 3) {
        None | Some(&"ext") => Some(MachineSpecs {
            vcpus,
            memory_mb,
            gpus: Vec::new(),
        }),
        Some(_) => None,
    }
}

fn parse_table<T: DeserializeOwned>(name: &str, content: &str) -> Result<T> {
    serde_json::from_str(content)
        .map_err(|e| Error::DataError(format!("cannot parse data file '{}': {}", name, e)))
}

async fn load_table<T: DeserializeOwned>(
    data_dir: Option<&Path>,
    name: &str,
    embedded: &str,
) -> Result<T> {
    if let Some(dir) = data_dir {
        let path = dir.join(name);
        if tokio::fs::try_exists(&path).await? {
            debug!("  reading datafile '{}' from: {}", name, path.display());
            let content = tokio::fs::read_to_string(&path).await?;
            return parse_table(name, &content);
        }
    }
    debug!("  reading datafile '{}' embedded", name);
    parse_table(name, embedded)
}
