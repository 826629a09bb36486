//! Exchange symbol metadata.

use serde::Deserialize;

use super::numeric::opt_f64_from_str;

/// Trading rules for one symbol, derived from the exchange-info filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Minimum order value in the quote asset.
    pub min_notional: f64,
    /// Minimum order quantity.
    pub min_quantity: f64,
    /// Quantity increment.
    pub step_size: f64,
    /// Price increment.
    pub tick_size: f64,
}

impl SymbolInfo {
    pub fn is_tradable(&self) -> bool {
        self.status == "TRADING"
    }
}

/// Raw exchange-info response.
#[derive(Debug, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<RawSymbolInfo>,
}

/// One symbol entry as returned by the exchange-info endpoint.
#[derive(Debug, Deserialize)]
pub struct RawSymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// A single filter entry. The exchange mixes several filter shapes in one
/// list; unrelated fields stay `None`.
#[derive(Debug, Default, Deserialize)]
pub struct SymbolFilter {
    #[serde(rename = "filterType", default)]
    pub filter_type: String,
    #[serde(rename = "minNotional", default, deserialize_with = "opt_f64_from_str")]
    pub min_notional: Option<f64>,
    #[serde(rename = "minQty", default, deserialize_with = "opt_f64_from_str")]
    pub min_qty: Option<f64>,
    #[serde(rename = "stepSize", default, deserialize_with = "opt_f64_from_str")]
    pub step_size: Option<f64>,
    #[serde(rename = "tickSize", default, deserialize_with = "opt_f64_from_str")]
    pub tick_size: Option<f64>,
}

impl RawSymbolInfo {
    /// Flattens the filter list into a [`SymbolInfo`].
    ///
    /// Min-notional is taken from whichever filter carries it; lot limits
    /// come from `LOT_SIZE` and the tick size from `PRICE_FILTER`.
    pub fn into_info(self) -> SymbolInfo {
        let mut info = SymbolInfo {
            symbol: self.symbol,
            status: self.status,
            base_asset: self.base_asset,
            quote_asset: self.quote_asset,
            ..SymbolInfo::default()
        };

        for filter in &self.filters {
            if let Some(min_notional) = filter.min_notional {
                info.min_notional = min_notional;
            }
            match filter.filter_type.as_str() {
                "LOT_SIZE" => {
                    info.min_quantity = filter.min_qty.unwrap_or_default();
                    info.step_size = filter.step_size.unwrap_or_default();
                }
                "PRICE_FILTER" => {
                    info.tick_size = filter.tick_size.unwrap_or_default();
                }
                _ => {}
            }
        }

        info
    }
}
