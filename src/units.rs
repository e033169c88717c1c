//! Report units and decimal rounding

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fractional digits kept on every power and emission figure
pub const DECIMAL_PLACES: u32 = 10;

/// Floor a value (toward negative infinity) to [`DECIMAL_PLACES`] digits
pub fn round_floor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToNegativeInfinity)
}

/// Time span emissions are reported over
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    /// 30 days
    #[serde(rename = "m")]
    Month,
    /// 365 days
    #[serde(rename = "y")]
    Year,
}

impl TimeUnit {
    /// Hours in one unit. Fixed constants, not calendar accurate.
    pub fn hours(&self) -> Decimal {
        match self {
            TimeUnit::Hour => Decimal::ONE,
            TimeUnit::Day => Decimal::from(24),
            TimeUnit::Month => Decimal::from(24 * 30),
            TimeUnit::Year => Decimal::from(24 * 365),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Month => "m",
            TimeUnit::Year => "y",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h" => Ok(TimeUnit::Hour),
            "d" => Ok(TimeUnit::Day),
            "m" => Ok(TimeUnit::Month),
            "y" => Ok(TimeUnit::Year),
            other => Err(Error::ConfigError(format!(
                "unknown time unit '{}', expected one of h, d, m, y",
                other
            ))),
        }
    }
}

/// Mass unit emissions are reported in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarbonUnit {
    #[default]
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
}

impl CarbonUnit {
    /// Grams per unit
    pub fn divisor(&self) -> Decimal {
        match self {
            CarbonUnit::Gram => Decimal::ONE,
            CarbonUnit::Kilogram => Decimal::from(1000),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CarbonUnit::Gram => "g",
            CarbonUnit::Kilogram => "kg",
        }
    }
}

impl fmt::Display for CarbonUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarbonUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "g" => Ok(CarbonUnit::Gram),
            "kg" => Ok(CarbonUnit::Kilogram),
            other => Err(Error::ConfigError(format!(
                "unknown carbon unit '{}', expected g or kg",
                other
            ))),
        }
    }
}
