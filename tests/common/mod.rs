//! Shared test utilities and constants.

use ticksync::config::ExchangeConfig;

/// Public exchange WebSocket endpoint.
pub const EXCHANGE_WS_URL: &str = "wss://stream.binance.com:9443";

/// Public exchange REST endpoint.
pub const EXCHANGE_API_URL: &str = "https://api.binance.com";

/// Builds an exchange config pointing at the live public endpoints.
pub fn exchange_config() -> ExchangeConfig {
    ExchangeConfig {
        ws_url: EXCHANGE_WS_URL.to_string(),
        api_url: EXCHANGE_API_URL.to_string(),
    }
}
