//! REST command surface of the backend.
//!
//! Commands travel over HTTP rather than the control socket so the server
//! can reject them synchronously. Failures come back as JSON bodies with a
//! `message` field, surfaced here as [`TickSyncError::CommandRejected`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TickSyncError};
use crate::pricing::PriceSource;

/// Header carrying the session credential on every command.
pub const SESSION_HEADER: &str = "X-Session-ID";

/// Options for opening a new trade.
///
/// Serializes to the buy request body the server expects, camelCase keys
/// with optional settings omitted when unset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTradeOptions {
    pub symbol: String,
    pub quantity: f64,
    pub price_source: String,
    /// Percent applied to the source price before the order is placed.
    pub price_adjustment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_sell_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_sell_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_sell_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_sell_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_profit_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_profit_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_profit_deviation: Option<f64>,
    /// Ticks added to the source price after the percent adjustment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_ticks: Option<i64>,
}

impl OpenTradeOptions {
    pub fn new(symbol: impl Into<String>, quantity: f64, source: PriceSource) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            price_source: source.wire_name().to_string(),
            price_adjustment: 0.0,
            price: source.manual_price(),
            stop_loss_enabled: None,
            stop_loss_percent: None,
            limit_sell_enabled: None,
            limit_sell_type: None,
            limit_sell_percent: None,
            limit_sell_price: None,
            trailing_profit_enabled: None,
            trailing_profit_percent: None,
            trailing_profit_deviation: None,
            offset_ticks: None,
        }
    }
}

/// Response to an accepted buy request.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyOrderResponse {
    pub trade_id: String,
}

/// Server identity reported by `GET /api/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub git_revision: String,
    #[serde(default)]
    pub git_branch: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Issues trade commands against the backend's REST API.
#[derive(Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

impl CommandClient {
    pub fn new(base_url: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            session_id,
        }
    }

    /// Opens a trade. The returned id keys the record the control channel
    /// will push once the server registers the trade.
    pub async fn open_trade(&self, options: &OpenTradeOptions) -> Result<BuyOrderResponse> {
        debug!(symbol = %options.symbol, quantity = options.quantity, "Posting buy order");
        let request = self.http.post(self.url("/api/binance/buy")).json(options);
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    pub async fn cancel_buy(&self, trade_id: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.url("/api/binance/buy"))
            .query(&[("trade_id", trade_id)]);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn cancel_sell(&self, trade_id: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.url("/api/binance/sell"))
            .query(&[("trade_id", trade_id)]);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn update_stop_loss(&self, trade_id: &str, enable: bool, percent: f64) -> Result<()> {
        let request = self
            .http
            .post(self.trade_url(trade_id, "stopLoss"))
            .query(&[
                ("enable", enable.to_string()),
                ("percent", format!("{percent:.8}")),
            ]);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn update_trailing_profit(
        &self,
        trade_id: &str,
        enable: bool,
        percent: f64,
        deviation: f64,
    ) -> Result<()> {
        let request = self
            .http
            .post(self.trade_url(trade_id, "trailingProfit"))
            .query(&[
                ("enable", enable.to_string()),
                ("percent", format!("{percent:.8}")),
                ("deviation", format!("{deviation:.8}")),
            ]);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn limit_sell_by_percent(&self, trade_id: &str, percent: f64) -> Result<()> {
        let request = self
            .http
            .post(self.trade_url(trade_id, "limitSellByPercent"))
            .query(&[("percent", format!("{percent:.8}"))]);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn limit_sell_by_price(&self, trade_id: &str, price: f64) -> Result<()> {
        let request = self
            .http
            .post(self.trade_url(trade_id, "limitSellByPrice"))
            .query(&[("price", format!("{price:.8}"))]);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn market_sell(&self, trade_id: &str) -> Result<()> {
        self.execute(self.http.post(self.trade_url(trade_id, "marketSell")))
            .await?;
        Ok(())
    }

    pub async fn archive(&self, trade_id: &str) -> Result<()> {
        self.execute(self.http.post(self.trade_url(trade_id, "archive")))
            .await?;
        Ok(())
    }

    pub async fn abandon(&self, trade_id: &str) -> Result<()> {
        self.execute(self.http.post(self.trade_url(trade_id, "abandon")))
            .await?;
        Ok(())
    }

    pub async fn get_version(&self) -> Result<VersionInfo> {
        let response = self.execute(self.http.get(self.url("/api/version"))).await?;
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn trade_url(&self, trade_id: &str, action: &str) -> String {
        self.url(&format!("/api/binance/trade/{trade_id}/{action}"))
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = match &self.session_id {
            Some(session_id) => request.header(SESSION_HEADER, session_id),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message.unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        Err(TickSyncError::CommandRejected(message))
    }
}
