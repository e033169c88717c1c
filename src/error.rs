//! Error types for the estimation pipeline

use thiserror::Error;

use crate::carbon_aware::ForecastError;

#[derive(Error, Debug)]
pub enum Error {
    /// No grid carbon intensity is known for the resource's region.
    /// Every supported resource needs an emissions figure, so this aborts the run.
    #[error("No carbon intensity for region '{region}' ({provider}) needed by {address}")]
    MissingRegionIntensity {
        address: String,
        provider: String,
        region: String,
    },

    /// A power or emission figure left the representable decimal range
    #[error("Arithmetic overflow while estimating {address}")]
    Overflow { address: String },

    /// Forecast file could not be used
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Plan document is not a usable Terraform JSON plan
    #[error("Plan error: {0}")]
    PlanError(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Coefficient table could not be loaded
    #[error("Coefficient data error: {0}")]
    DataError(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A fan-out estimation task failed to complete
    #[error("Estimation task failed: {0}")]
    TaskError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
