//! Account balance events.

use serde::Deserialize;

use super::numeric::f64_from_str;

/// Account snapshot from the user-data `outboundAccountInfo` event,
/// relayed over the control channel with the exchange's short keys intact.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoEvent {
    #[serde(rename = "B", default)]
    pub balances: Vec<RawBalance>,
}

/// One balance entry as carried on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBalance {
    #[serde(rename = "a")]
    pub asset: String,
    #[serde(rename = "f", deserialize_with = "f64_from_str")]
    pub free: f64,
    #[serde(rename = "l", deserialize_with = "f64_from_str")]
    pub locked: f64,
}

/// Normalized per-asset balance.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetBalance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

impl AssetBalance {
    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}

impl From<RawBalance> for AssetBalance {
    fn from(raw: RawBalance) -> Self {
        Self {
            asset: raw.asset,
            free: raw.free,
            locked: raw.locked,
        }
    }
}

impl AccountInfoEvent {
    /// Normalizes the wire balances.
    pub fn into_balances(self) -> Vec<AssetBalance> {
        self.balances.into_iter().map(AssetBalance::from).collect()
    }
}
