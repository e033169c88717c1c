//! tf-carbon: carbon footprint estimation for infrastructure-as-code plans
//!
//! This crate reads a Terraform plan, normalizes the planned compute and
//! storage resources into hardware specs, and estimates their average power
//! draw and CO2-equivalent emissions from per-provider energy coefficients
//! and regional grid carbon intensity.

pub mod carbon_aware;
pub mod coefficients;
pub mod config;
pub mod error;
pub mod estimate;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod resources;
pub mod units;

pub use crate::error::{Error, Result};
pub use crate::pipeline::Pipeline;
