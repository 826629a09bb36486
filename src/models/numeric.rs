//! Serde helpers for the exchange's stringified wire fields.
//!
//! Market payloads carry prices and quantities as decimal strings
//! (`"0.00350000"`); they are parsed to `f64` here, at the boundary, so no
//! other module handles raw number strings.

use serde::{Deserialize, Deserializer};

/// Deserializes a decimal string into an `f64`.
pub fn f64_from_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<f64>().map_err(serde::de::Error::custom)
}

/// Deserializes an optional decimal string into an `Option<f64>`.
pub fn opt_f64_from_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|s| s.parse::<f64>().map_err(serde::de::Error::custom))
        .transpose()
}

/// Deserializes a string, normalizing it to upper case.
pub fn uppercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.to_uppercase())
}
