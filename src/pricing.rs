//! Price selection, tick-aligned adjustment, and unrealized profit math.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TickSyncError};
use crate::market::MarketDataClient;
use crate::models::TradeRecord;
use crate::rounding::{round8, round_to_step};

/// Where the price for a new order comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceSource {
    /// Last observed trade price for the symbol.
    LastTrade,
    /// Current best bid, fetched at order time.
    BestBid,
    /// Current best ask, fetched at order time.
    BestAsk,
    /// Operator-supplied price.
    Manual(f64),
}

impl PriceSource {
    /// Name used in buy request bodies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PriceSource::LastTrade => "LAST_PRICE",
            PriceSource::BestBid => "BEST_BID",
            PriceSource::BestAsk => "BEST_ASK",
            PriceSource::Manual(_) => "MANUAL",
        }
    }

    pub fn manual_price(&self) -> Option<f64> {
        match self {
            PriceSource::Manual(price) => Some(*price),
            _ => None,
        }
    }
}

/// A profit readout for one trade at one observed price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitQuote {
    pub last_price: f64,
    /// Net quote-asset gain per unit after the sell-side fee.
    pub profit: f64,
    pub profit_percent: f64,
    /// How far the buy price sits from the current price, in percent.
    pub buy_offset_percent: f64,
}

/// Unrealized profit of a filled trade at `last_price`, net of the
/// sell-side fee. Trades with no fill have no quote.
pub fn compute_profit(trade: &TradeRecord, last_price: f64) -> Option<ProfitQuote> {
    if trade.buy_fill_quantity <= 0.0 || trade.effective_buy_price <= 0.0 {
        return None;
    }
    let fee = trade.effective_fee();
    let profit = last_price * (1.0 - fee) - trade.effective_buy_price;
    let profit_percent = profit / trade.effective_buy_price * 100.0;
    let buy_offset_percent = if last_price > 0.0 {
        (trade.buy_order.price - last_price) / last_price * 100.0
    } else {
        0.0
    };
    Some(ProfitQuote {
        last_price,
        profit,
        profit_percent,
        buy_offset_percent,
    })
}

/// Tracks last trade prices and resolves order prices against the live
/// market and the symbol catalog.
pub struct PriceEngine {
    market: Arc<MarketDataClient>,
    last_prices: Mutex<HashMap<String, f64>>,
}

impl PriceEngine {
    pub fn new(market: Arc<MarketDataClient>) -> Self {
        Self {
            market,
            last_prices: Mutex::new(HashMap::new()),
        }
    }

    /// Records an observed trade price for a symbol.
    pub fn record_trade(&self, symbol: &str, price: f64) {
        self.last_prices
            .lock()
            .unwrap()
            .insert(symbol.to_uppercase(), price);
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices
            .lock()
            .unwrap()
            .get(&symbol.to_uppercase())
            .copied()
    }

    /// Snapshot of every known last price, keyed by symbol.
    pub fn price_map(&self) -> HashMap<String, f64> {
        self.last_prices.lock().unwrap().clone()
    }

    /// Resolves the order price for a source. Book-side sources hit the
    /// exchange REST API; [`PriceSource::LastTrade`] requires at least one
    /// recorded trade.
    pub async fn get_price(&self, symbol: &str, source: PriceSource) -> Result<f64> {
        match source {
            PriceSource::Manual(price) => Ok(price),
            PriceSource::LastTrade => self
                .last_price(symbol)
                .ok_or_else(|| TickSyncError::PriceUnavailable(symbol.to_string())),
            PriceSource::BestBid => Ok(self.market.book_ticker(symbol).await?.bid_price),
            PriceSource::BestAsk => Ok(self.market.book_ticker(symbol).await?.ask_price),
        }
    }

    /// Applies a percent adjustment and aligns the result to the symbol's
    /// price tick.
    pub fn adjust_price(&self, symbol: &str, price: f64, percent: f64) -> Result<f64> {
        let tick = self.market.catalog().tick_size(symbol)?;
        round_to_step(price * (1.0 + percent / 100.0), tick)
    }

    /// Moves a price by a whole number of ticks.
    pub fn adjust_price_by_ticks(&self, symbol: &str, price: f64, ticks: i64) -> Result<f64> {
        let tick = self.market.catalog().tick_size(symbol)?;
        Ok(round8(price + tick * ticks as f64))
    }
}
