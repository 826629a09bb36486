//! Ticker events and best bid/ask lookups.

use serde::Deserialize;

use super::numeric::{f64_from_str, uppercase};

/// 24-hour rolling ticker event from the `<symbol>@ticker` stream.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerEvent {
    #[serde(rename = "s", deserialize_with = "uppercase")]
    pub symbol: String,
    /// Latest traded price.
    #[serde(rename = "c", deserialize_with = "f64_from_str")]
    pub last_price: f64,
    #[serde(rename = "b", deserialize_with = "f64_from_str")]
    pub best_bid: f64,
    #[serde(rename = "a", deserialize_with = "f64_from_str")]
    pub best_ask: f64,
    /// Quote-asset volume over the rolling window.
    #[serde(rename = "q", deserialize_with = "f64_from_str")]
    pub quote_volume: f64,
    #[serde(rename = "P", deserialize_with = "f64_from_str")]
    pub percent_change: f64,
}

/// Best bid/ask snapshot from the book-ticker endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BookTicker {
    pub symbol: String,
    #[serde(rename = "bidPrice", deserialize_with = "f64_from_str")]
    pub bid_price: f64,
    #[serde(rename = "askPrice", deserialize_with = "f64_from_str")]
    pub ask_price: f64,
}
