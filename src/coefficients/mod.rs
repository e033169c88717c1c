//! Coefficient tables
//!
//! Machine shapes, GPU and disk power draw, provider energy coefficients and
//! regional grid carbon intensity. Loaded once per run and never mutated.

pub mod provider;
pub mod types;

pub use provider::{parse_custom_machine_type, CoefficientProvider, StaticCoefficients};
pub use types::{
    CoefficientTables, DiskCoefficient, EnergyCoefficients, GpuCoefficient, MachineSpecs,
    RegionEmission, StorageKind,
};
