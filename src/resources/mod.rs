//! Provider-agnostic resource model shared by extraction and estimation

pub mod types;

pub use types::{
    ComputeResource, ComputeResourceSpecs, Provider, Resource, ResourceIdentification,
    UnsupportedResource,
};
