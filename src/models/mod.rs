//! Wire types for the control channel and the exchange market streams.
//!
//! Contains the control-message envelope, trade records, per-channel market
//! events, and the serde helpers that parse stringified decimals at the
//! boundary.

pub mod agg_trade;
pub mod balance;
pub mod depth;
pub mod envelope;
pub mod numeric;
pub mod symbol;
pub mod ticker;
pub mod trade;

pub use agg_trade::AggTradeEvent;
pub use balance::{AccountInfoEvent, AssetBalance};
pub use depth::{DepthEvent, PriceLevel};
pub use envelope::{ControlMessage, HealthState, NoticeEvent, NoticeLevel};
pub use symbol::SymbolInfo;
pub use ticker::{BookTicker, TickerEvent};
pub use trade::{TradeRecord, TradeStatus};

/// Market stream channels carried over the multiplexed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamChannel {
    Ticker,
    AggTrade,
    /// Partial book depth, 5 levels per side (wire name: `"depth5"`).
    Depth,
}

impl StreamChannel {
    /// Returns the wire-format channel name expected by the exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamChannel::Ticker => "ticker",
            StreamChannel::AggTrade => "aggTrade",
            StreamChannel::Depth => "depth5",
        }
    }

    /// Builds the subscription key for `symbol` on this channel.
    pub fn stream_key(&self, symbol: &str) -> String {
        format!("{}@{}", symbol.to_lowercase(), self.as_str())
    }
}
