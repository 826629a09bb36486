//! Presentation state derived from the trade store.
//!
//! A [`TradeView`] is one display row: the underlying record, a live
//! profit quote when the trade is still running, and a tone that drives
//! row styling. Rows sort newest-first by open time.

use std::collections::HashMap;

use crate::models::{TradeRecord, TradeStatus};
use crate::pricing::{ProfitQuote, compute_profit};

/// Visual tone of a trade row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    /// Canceled, failed, or abandoned trades.
    Muted,
    /// In profit, or closed in profit.
    Success,
    /// At a loss, or closed at a loss.
    Warning,
    /// Still opening; no meaningful profit yet.
    Info,
}

/// One display row over a trade record.
#[derive(Debug, Clone)]
pub struct TradeView {
    pub trade: TradeRecord,
    /// Live profit at the latest observed price. Terminal trades freeze at
    /// their recorded result and carry no quote.
    pub quote: Option<ProfitQuote>,
    pub tone: RowTone,
}

impl TradeView {
    pub fn build(trade: TradeRecord, last_price: Option<f64>) -> Self {
        let live_price = last_price.or_else(|| {
            if trade.last_price > 0.0 {
                Some(trade.last_price)
            } else {
                None
            }
        });

        let quote = if trade.status.is_terminal() {
            None
        } else {
            live_price.and_then(|price| compute_profit(&trade, price))
        };

        let tone = classify(&trade, quote.as_ref());
        Self { trade, quote, tone }
    }

    /// Live profit percent when running, recorded result otherwise.
    pub fn profit_percent(&self) -> f64 {
        self.quote
            .map(|quote| quote.profit_percent)
            .unwrap_or(self.trade.profit_percent)
    }

    pub fn can_archive(&self) -> bool {
        self.trade.status.is_terminal()
    }

    pub fn can_sell(&self) -> bool {
        matches!(
            self.trade.status,
            TradeStatus::Watching | TradeStatus::PendingSell
        )
    }

    pub fn can_abandon(&self) -> bool {
        !self.trade.status.is_terminal()
    }
}

fn classify(trade: &TradeRecord, quote: Option<&ProfitQuote>) -> RowTone {
    match trade.status {
        TradeStatus::Canceled | TradeStatus::Failed | TradeStatus::Abandoned => RowTone::Muted,
        TradeStatus::Done => {
            if trade.profit_percent > 0.0 {
                RowTone::Success
            } else {
                RowTone::Warning
            }
        }
        TradeStatus::New | TradeStatus::PendingBuy => RowTone::Info,
        TradeStatus::Watching | TradeStatus::PendingSell => {
            let percent = quote
                .map(|quote| quote.profit_percent)
                .unwrap_or(trade.profit_percent);
            if percent > 0.0 {
                RowTone::Success
            } else {
                RowTone::Warning
            }
        }
    }
}

/// Builds display rows from a store snapshot and the latest prices,
/// newest trade first.
pub fn build_rows(snapshot: Vec<TradeRecord>, prices: &HashMap<String, f64>) -> Vec<TradeView> {
    let mut rows: Vec<TradeView> = snapshot
        .into_iter()
        .map(|trade| {
            let price = prices.get(&trade.symbol).copied();
            TradeView::build(trade, price)
        })
        .collect();
    // Open times are RFC 3339, so string order is time order.
    rows.sort_by(|a, b| b.trade.open_time.cmp(&a.trade.open_time));
    rows
}
