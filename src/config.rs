//! Estimation configuration
//!
//! Loaded once at the boundary (TOML file, then CLI overrides) and threaded
//! explicitly through the pipeline.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::resources::Provider;
use crate::units::{CarbonUnit, TimeUnit};

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimationConfig {
    pub unit: UnitConfig,
    pub provider: ProvidersConfig,
    pub data: DataConfig,
}

/// Units the report is expressed in
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UnitConfig {
    pub time: TimeUnit,
    pub carbon: CarbonUnit,
}

/// Per-provider utilization assumptions
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gcp: ProviderUsage,
    pub aws: ProviderUsage,
}

/// Assumed average utilization of a provider's hardware
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderUsage {
    /// Fraction of CPU capacity in use on average (0..=1)
    pub avg_cpu_use: Decimal,
    /// Fraction of GPU capacity in use on average (0..=1)
    pub avg_gpu_use: Decimal,
}

impl Default for ProviderUsage {
    fn default() -> Self {
        Self {
            avg_cpu_use: Decimal::new(5, 1),
            avg_gpu_use: Decimal::new(5, 1),
        }
    }
}

/// Location of coefficient table overrides
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
}

impl EstimationConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EstimationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    /// Utilization assumptions for a provider. Providers without their own
    /// section share the GCP defaults.
    pub fn usage_for(&self, provider: &Provider) -> &ProviderUsage {
        match provider {
            Provider::Aws => &self.provider.aws,
            Provider::Gcp | Provider::Other(_) => &self.provider.gcp,
        }
    }

    /// Reject utilization fractions outside `0..=1`
    pub fn validate(&self) -> Result<()> {
        for (name, usage) in [("gcp", &self.provider.gcp), ("aws", &self.provider.aws)] {
            for (field, value) in [
                ("avg_cpu_use", usage.avg_cpu_use),
                ("avg_gpu_use", usage.avg_gpu_use),
            ] {
                if value < Decimal::ZERO || value > Decimal::ONE {
                    return Err(Error::ConfigError(format!(
                        "provider.{}.{} must be between 0 and 1, got {}",
                        name, field, value
                    )));
                }
            }
        }
        Ok(())
    }
}
