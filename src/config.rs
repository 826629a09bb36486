//! Application configuration loaded from environment variables.
//!
//! - `TICKSYNC_SERVER_URL` — HTTP base URL of the maker backend
//! - `TICKSYNC_SESSION_ID` — optional session credential sent with every
//!   request and on the realtime channel
//! - `TICKSYNC_EXCHANGE_WS_URL` — exchange market-data stream endpoint
//! - `TICKSYNC_EXCHANGE_API_URL` — exchange public REST endpoint
//! - `TICKSYNC_SYMBOLS` — comma-separated symbols to watch

/// Default backend base URL.
const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Default exchange market-data stream endpoint.
const DEFAULT_EXCHANGE_WS_URL: &str = "wss://stream.binance.com:9443";

/// Default exchange public REST endpoint.
const DEFAULT_EXCHANGE_API_URL: &str = "https://api.binance.com";

/// Default watched symbols.
const DEFAULT_SYMBOLS: &str = "BTCUSDT";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub exchange: ExchangeConfig,
    /// Upper-cased symbols to watch on the market streams.
    pub symbols: Vec<String>,
}

/// Backend endpoint and credential.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub url: String,
    pub session_id: Option<String>,
}

impl ServerConfig {
    /// Realtime endpoint derived from the HTTP base URL, carrying the
    /// session credential when one is configured.
    pub fn websocket_url(&self) -> String {
        let base = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.url)
        };
        let base = base.trim_end_matches('/');

        match &self.session_id {
            Some(session_id) => format!("{base}/ws?sessionId={session_id}"),
            None => format!("{base}/ws"),
        }
    }
}

/// Exchange endpoints.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub ws_url: String,
    pub api_url: String,
}

/// Loads the application configuration from environment variables.
///
/// Every variable has a default; empty values are treated as absent.
///
/// # Errors
///
/// Returns [`TickSyncError::Config`](crate::TickSyncError::Config) if an
/// endpoint URL has the wrong scheme or no watched symbol remains after
/// parsing.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let server_url =
        non_empty_var("TICKSYNC_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        return Err(crate::TickSyncError::Config(format!(
            "TICKSYNC_SERVER_URL must start with http:// or https://, got {server_url}"
        )));
    }

    let exchange_ws_url = non_empty_var("TICKSYNC_EXCHANGE_WS_URL")
        .unwrap_or_else(|| DEFAULT_EXCHANGE_WS_URL.to_string());
    if !exchange_ws_url.starts_with("ws://") && !exchange_ws_url.starts_with("wss://") {
        return Err(crate::TickSyncError::Config(format!(
            "TICKSYNC_EXCHANGE_WS_URL must start with ws:// or wss://, got {exchange_ws_url}"
        )));
    }

    let exchange_api_url = non_empty_var("TICKSYNC_EXCHANGE_API_URL")
        .unwrap_or_else(|| DEFAULT_EXCHANGE_API_URL.to_string());
    if !exchange_api_url.starts_with("http://") && !exchange_api_url.starts_with("https://") {
        return Err(crate::TickSyncError::Config(format!(
            "TICKSYNC_EXCHANGE_API_URL must start with http:// or https://, got {exchange_api_url}"
        )));
    }

    let symbols: Vec<String> =
        non_empty_var("TICKSYNC_SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string())
            .split(',')
            .map(|symbol| symbol.trim().to_uppercase())
            .filter(|symbol| !symbol.is_empty())
            .collect();
    if symbols.is_empty() {
        return Err(crate::TickSyncError::Config(
            "TICKSYNC_SYMBOLS must name at least one symbol".to_string(),
        ));
    }

    Ok(AppConfig {
        server: ServerConfig {
            url: server_url,
            session_id: non_empty_var("TICKSYNC_SESSION_ID"),
        },
        exchange: ExchangeConfig {
            ws_url: exchange_ws_url,
            api_url: exchange_api_url,
        },
        symbols,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
