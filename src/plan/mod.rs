//! Terraform JSON plan reader
//!
//! Reads the output of `terraform show -json <planfile>` into flat
//! [`PlanResource`] records. Only planned managed resources are kept; data
//! sources never create infrastructure.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One raw resource record from a plan
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanResource {
    /// Terraform address (`module.x.google_compute_instance.vm[0]`)
    pub address: String,
    /// Provider name (`google`, `registry.terraform.io/hashicorp/aws`, ...)
    pub provider_name: String,
    pub resource_type: String,
    pub name: String,
    /// Planned attribute values
    pub values: Map<String, Value>,
    /// Region configured on the provider block, used when the resource has none
    pub default_region: Option<String>,
}

impl PlanResource {
    /// Record name including its `count`/`for_each` index, if any
    /// (`disk["a.b"]`, `worker[1]`)
    pub fn indexed_name(&self) -> String {
        match self.local_offset() {
            Some(offset) => self.address[offset + self.resource_type.len() + 1..].to_string(),
            None => self.name.clone(),
        }
    }

    /// Module path of the record (`module.db`, `module.a["x"].module.b`),
    /// `None` in the root module
    pub fn module_path(&self) -> Option<String> {
        let offset = self.local_offset()?;
        self.address[..offset]
            .strip_suffix('.')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }

    /// Byte offset of `type.name` in the address.
    ///
    /// Module instance keys may contain dots and even the same text, so the
    /// match must start a segment and be followed by an index or the end.
    fn local_offset(&self) -> Option<usize> {
        let local = format!("{}.{}", self.resource_type, self.name);
        self.address
            .match_indices(&local)
            .map(|(offset, _)| offset)
            .find(|&offset| {
                let rest = &self.address[offset + local.len()..];
                (offset == 0 || self.address[..offset].ends_with('.'))
                    && (rest.is_empty() || rest.starts_with('['))
            })
    }
}

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    planned_values: Option<RawValues>,
    #[serde(default)]
    configuration: Option<RawConfiguration>,
}

#[derive(Deserialize)]
struct RawValues {
    #[serde(default)]
    root_module: Option<RawModule>,
}

#[derive(Deserialize)]
struct RawModule {
    #[serde(default)]
    resources: Vec<RawResource>,
    #[serde(default)]
    child_modules: Vec<RawModule>,
}

#[derive(Deserialize)]
struct RawResource {
    address: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    values: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawConfiguration {
    #[serde(default)]
    provider_config: HashMap<String, RawProviderConfig>,
}

#[derive(Deserialize)]
struct RawProviderConfig {
    name: String,
    #[serde(default)]
    expressions: Map<String, Value>,
}

/// Parse a JSON plan document
pub fn parse_plan(content: &str) -> Result<Vec<PlanResource>> {
    let raw: RawPlan = serde_json::from_str(content)
        .map_err(|e| Error::PlanError(format!("invalid JSON plan: {}", e)))?;

    let regions = provider_regions(raw.configuration.as_ref());
    let root = raw
        .planned_values
        .and_then(|values| values.root_module)
        .ok_or_else(|| Error::PlanError("plan has no planned_values.root_module".to_string()))?;

    let mut records = Vec::new();
    collect_module(root, &regions, &mut records);
    info!("Read {} resources from plan", records.len());
    Ok(records)
}

/// Read and parse a JSON plan file
pub async fn load_plan(path: &Path) -> Result<Vec<PlanResource>> {
    debug!("Reading plan from {}", path.display());
    let content = tokio::fs::read_to_string(path).await?;
    parse_plan(&content)
}

fn collect_module(
    module: RawModule,
    regions: &HashMap<String, String>,
    records: &mut Vec<PlanResource>,
) {
    for resource in module.resources {
        if resource.mode.as_deref() == Some("data") {
            debug!("Skipping data source {}", resource.address);
            continue;
        }
        let default_region = regions.get(short_provider_name(&resource.provider_name)).cloned();
        records.push(PlanResource {
            address: resource.address,
            provider_name: resource.provider_name,
            resource_type: resource.resource_type,
            name: resource.name,
            values: resource.values.unwrap_or_default(),
            default_region,
        });
    }
    for child in module.child_modules {
        collect_module(child, regions, records);
    }
}

/// `provider short name -> region` from constant provider block expressions
fn provider_regions(configuration: Option<&RawConfiguration>) -> HashMap<String, String> {
    let mut regions = HashMap::new();
    let Some(configuration) = configuration else {
        return regions;
    };
    for provider in configuration.provider_config.values() {
        let region = provider
            .expressions
            .get("region")
            .and_then(|r| r.get("constant_value"))
            .and_then(|v| v.as_str());
        if let Some(region) = region {
            regions
                .entry(short_provider_name(&provider.name).to_string())
                .or_insert_with(|| region.to_string());
        }
    }
    regions
}

fn short_provider_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
