//! Trade records exchanged with the backend.
//!
//! Field names follow the backend's wire format, which marshals its state
//! structs with PascalCase keys and plain JSON numbers.

use serde::{Deserialize, Serialize};

/// Default exchange fee rate applied when a record does not carry one.
pub const DEFAULT_FEE: f64 = 0.001;

/// Reduced fee rate when fees are paid with the exchange's discount asset.
pub const BNB_FEE: f64 = 0.00075;

/// Lifecycle states of a trade.
///
/// The buy side moves `New -> PendingBuy -> Watching`, the sell side
/// `Watching -> PendingSell -> Done`. `Canceled`, `Failed`, and `Abandoned`
/// are side exits reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    #[default]
    New,
    Failed,
    PendingBuy,
    Watching,
    PendingSell,
    Done,
    Canceled,
    Abandoned,
}

impl TradeStatus {
    /// Terminal states can no longer transition and may be archived.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Done | TradeStatus::Canceled | TradeStatus::Failed | TradeStatus::Abandoned
        )
    }
}

/// How a limit-sell target is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitSellType {
    #[default]
    Percent,
    Price,
}

/// Price and quantity of the opening buy order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BuyOrder {
    pub quantity: f64,
    pub price: f64,
}

/// Stop-loss settings attached to a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StopLoss {
    pub enabled: bool,
    pub percent: f64,
    pub triggered: bool,
}

/// Limit-sell settings attached to a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LimitSell {
    pub enabled: bool,
    #[serde(rename = "Type")]
    pub sell_type: LimitSellType,
    pub percent: f64,
    pub price: f64,
}

/// Trailing-profit settings attached to a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TrailingProfit {
    pub enabled: bool,
    pub percent: f64,
    pub deviation: f64,
    pub activated: bool,
    pub price: f64,
    pub triggered: bool,
}

/// State of the currently working sell order, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SellOrder {
    pub status: String,
    #[serde(rename = "Type")]
    pub order_type: String,
    pub quantity: f64,
    pub price: f64,
}

/// One tracked trade, keyed by its backend-assigned id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TradeRecord {
    #[serde(rename = "TradeID")]
    pub trade_id: String,
    pub symbol: String,
    pub status: TradeStatus,
    /// RFC 3339 timestamp assigned when the trade was opened.
    pub open_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<String>,
    #[serde(default = "default_fee")]
    pub fee: f64,
    pub buy_order: BuyOrder,
    pub buy_fill_quantity: f64,
    /// Fill quantity adjusted down to the symbol's lot step.
    pub sellable_quantity: f64,
    pub average_buy_price: f64,
    /// Total cost of the buy, including fees.
    pub buy_cost: f64,
    /// Buy price per unit accounting for fees; baseline for profit.
    pub effective_buy_price: f64,
    pub sell_fill_quantity: f64,
    pub average_sell_price: f64,
    pub sell_cost: f64,
    pub stop_loss: StopLoss,
    pub limit_sell: LimitSell,
    pub trailing_profit: TrailingProfit,
    /// Realized profit in units of the quote asset.
    pub profit: f64,
    pub profit_percent: f64,
    pub sell_order: SellOrder,
    /// Last price the backend observed for this symbol.
    pub last_price: f64,
}

impl TradeRecord {
    /// Fee rate for profit math, falling back to [`DEFAULT_FEE`].
    pub fn effective_fee(&self) -> f64 {
        if self.fee > 0.0 { self.fee } else { DEFAULT_FEE }
    }
}

fn default_fee() -> f64 {
    DEFAULT_FEE
}
