//! Aggregated trade events.

use serde::Deserialize;

use super::numeric::{f64_from_str, uppercase};

/// An aggregated trade from the `<symbol>@aggTrade` stream, also relayed
/// over the control channel for symbols the backend watches.
#[derive(Debug, Clone, Deserialize)]
pub struct AggTradeEvent {
    #[serde(rename = "s", deserialize_with = "uppercase")]
    pub symbol: String,
    #[serde(rename = "p", deserialize_with = "f64_from_str")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "f64_from_str")]
    pub quantity: f64,
    #[serde(rename = "f", default)]
    pub first_trade_id: u64,
    #[serde(rename = "l", default)]
    pub last_trade_id: u64,
    /// Trade time in epoch milliseconds.
    #[serde(rename = "T", default)]
    pub trade_time: u64,
    /// Whether the buyer was the passive side.
    #[serde(rename = "m", default)]
    pub buyer_is_maker: bool,
}
