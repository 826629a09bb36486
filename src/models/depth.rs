//! Partial order-book depth events.

use serde::{Deserialize, Deserializer};

/// One side level of the order book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Book snapshot from the `<symbol>@depth<N>` stream.
///
/// Levels arrive as `["price", "quantity"]` string tuples, best first.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthEvent {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    #[serde(deserialize_with = "levels")]
    pub bids: Vec<PriceLevel>,
    #[serde(deserialize_with = "levels")]
    pub asks: Vec<PriceLevel>,
}

impl DepthEvent {
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }
}

fn levels<'de, D>(deserializer: D) -> Result<Vec<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    // Price and quantity come first; some API versions append extra
    // elements to each level, which are ignored.
    let raw = Vec::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|level| {
            let price = level
                .first()
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| serde::de::Error::custom("depth level missing price"))?;
            let quantity = level
                .get(1)
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| serde::de::Error::custom("depth level missing quantity"))?;
            Ok(PriceLevel {
                price: price.parse().map_err(serde::de::Error::custom)?,
                quantity: quantity.parse().map_err(serde::de::Error::custom)?,
            })
        })
        .collect()
}
