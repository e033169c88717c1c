//! Attribute accessors for planned resource values
//!
//! Terraform encodes nested blocks as arrays of objects and leaves values
//! unknown at plan time out of the document entirely, so every accessor
//! returns `None` or an empty slice instead of failing.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::resources::Provider;

pub type Attributes = Map<String, Value>;

/// Non-empty string attribute
pub fn get_str<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a str> {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Numeric attribute as an exact decimal; numeric strings are accepted
pub fn get_decimal(attrs: &Attributes, key: &str) -> Option<Decimal> {
    match attrs.get(key)? {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Non-negative integer attribute
pub fn get_u32(attrs: &Attributes, key: &str) -> Option<u32> {
    match attrs.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Objects of a nested block attribute
pub fn get_blocks<'a>(attrs: &'a Attributes, key: &str) -> Vec<&'a Attributes> {
    match attrs.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(obj)) => vec![obj],
        _ => Vec::new(),
    }
}

/// First object of a nested block attribute
pub fn first_block<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a Attributes> {
    get_blocks(attrs, key).into_iter().next()
}

/// Length of a list attribute
pub fn list_len(attrs: &Attributes, key: &str) -> usize {
    attrs
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

/// First non-empty string of a list attribute
pub fn first_list_str<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a str> {
    attrs
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

/// Last path segment of a self link
/// (`projects/p/zones/z/acceleratorTypes/nvidia-tesla-t4` -> `nvidia-tesla-t4`)
pub fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

/// Strip the zone suffix from a zone name, leaving its region.
///
/// Values that already name a region are returned unchanged.
pub fn zone_to_region(provider: &Provider, zone: &str) -> String {
    let zone = last_segment(zone);
    match provider {
        Provider::Aws => {
            let mut chars = zone.chars().rev();
            match (chars.next(), chars.next()) {
                (Some(last), Some(prev)) if last.is_ascii_alphabetic() && prev.is_ascii_digit() => {
                    zone[..zone.len() - 1].to_string()
                }
                _ => zone.to_string(),
            }
        }
        Provider::Gcp | Provider::Other(_) => {
            let parts: Vec<&str> = zone.split('-').collect();
            if parts.len() >= 3 {
                parts[..parts.len() - 1].join("-")
            } else {
                zone.to_string()
            }
        }
    }
}

/// Region of a record from its own attributes: `region` as is, otherwise
/// the first zone-like attribute truncated to its region
pub fn region_from_attributes(provider: &Provider, attrs: &Attributes) -> Option<String> {
    if let Some(region) = get_str(attrs, "region") {
        return Some(last_segment(region).to_string());
    }
    ["zone", "availability_zone", "location"]
        .iter()
        .find_map(|key| get_str(attrs, key))
        .map(|zone| zone_to_region(provider, zone))
}
