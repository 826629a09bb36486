//! Direct-to-exchange market data: streams and public REST lookups.
//!
//! Streams go through the [`StreamMultiplexer`] so any number of consumers
//! of one symbol share one upstream connection. REST covers the symbol
//! catalog (exchange info filters) and point-in-time book lookups.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::ExchangeConfig;
use crate::error::{Result, TickSyncError};
use crate::models::symbol::{ExchangeInfoResponse, RawSymbolInfo};
use crate::models::{
    AggTradeEvent, BookTicker, DepthEvent, StreamChannel, SymbolInfo, TickerEvent,
};
use crate::mux::{ExchangeConnector, StreamMultiplexer, StreamSubscription};

pub struct MarketDataClient {
    mux: StreamMultiplexer,
    http: reqwest::Client,
    api_url: String,
    catalog: SymbolCatalog,
}

impl MarketDataClient {
    pub fn new(config: &ExchangeConfig) -> Self {
        let connector = ExchangeConnector::new(config.ws_url.clone());
        Self {
            mux: StreamMultiplexer::new(Arc::new(connector)),
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            catalog: SymbolCatalog::default(),
        }
    }

    /// 24h rolling ticker updates for a symbol.
    pub fn ticker_stream(&self, symbol: &str) -> EventStream<TickerEvent> {
        self.stream(StreamChannel::Ticker, symbol)
    }

    /// Aggregated trades for a symbol.
    pub fn agg_trade_stream(&self, symbol: &str) -> EventStream<AggTradeEvent> {
        self.stream(StreamChannel::AggTrade, symbol)
    }

    /// Top-five book levels for a symbol.
    pub fn depth_stream(&self, symbol: &str) -> EventStream<DepthEvent> {
        self.stream(StreamChannel::Depth, symbol)
    }

    fn stream<T: DeserializeOwned>(&self, channel: StreamChannel, symbol: &str) -> EventStream<T> {
        EventStream::new(self.mux.subscribe(&channel.stream_key(symbol)))
    }

    /// Refreshes the symbol catalog from the exchange. Returns the number
    /// of symbols loaded.
    pub async fn fetch_exchange_info(&self) -> Result<usize> {
        let url = format!("{}/api/v1/exchangeInfo", self.api_url);
        let response: ExchangeInfoResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let count = response.symbols.len();
        self.catalog
            .replace(response.symbols.into_iter().map(RawSymbolInfo::into_info));
        info!(symbols = count, "Loaded exchange info");
        Ok(count)
    }

    /// Current best bid and ask for a symbol.
    pub async fn book_ticker(&self, symbol: &str) -> Result<BookTicker> {
        let url = format!("{}/api/v3/ticker/bookTicker", self.api_url);
        let ticker = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ticker)
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    /// Streams with a live upstream connection right now.
    pub fn active_stream_count(&self) -> usize {
        self.mux.active_stream_count()
    }
}

/// Typed view over one multiplexed stream. Frames that fail to decode are
/// logged and skipped so one odd frame never ends the stream.
pub struct EventStream<T> {
    subscription: StreamSubscription,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> EventStream<T> {
    fn new(subscription: StreamSubscription) -> Self {
        Self {
            subscription,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        self.subscription.key()
    }

    /// Next decoded event, or `None` once the stream is torn down.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let value = self.subscription.recv().await?;
            match serde_json::from_value(value) {
                Ok(event) => return Some(event),
                Err(e) => {
                    warn!(stream = self.subscription.key(), error = %e, "Dropping undecodable event");
                }
            }
        }
    }
}

/// Lookup table of per-symbol trading rules, filled from exchange info.
#[derive(Clone, Default)]
pub struct SymbolCatalog {
    symbols: Arc<Mutex<HashMap<String, SymbolInfo>>>,
}

impl SymbolCatalog {
    /// Replaces the whole catalog with a fresh exchange-info load.
    pub fn replace(&self, entries: impl IntoIterator<Item = SymbolInfo>) {
        let mut symbols = self.symbols.lock().unwrap();
        symbols.clear();
        for info in entries {
            symbols.insert(info.symbol.clone(), info);
        }
    }

    pub fn get(&self, symbol: &str) -> Option<SymbolInfo> {
        self.symbols.lock().unwrap().get(&symbol.to_uppercase()).cloned()
    }

    /// Price tick for a symbol, or [`TickSyncError::UnknownSymbol`] when the
    /// catalog has not seen it.
    pub fn tick_size(&self, symbol: &str) -> Result<f64> {
        self.get(symbol)
            .map(|info| info.tick_size)
            .ok_or_else(|| TickSyncError::UnknownSymbol(symbol.to_string()))
    }

    /// Symbols currently open for trading, sorted.
    pub fn tradable_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .symbols
            .lock()
            .unwrap()
            .values()
            .filter(|info| info.is_tradable())
            .map(|info| info.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    /// Tradable symbols quoted in `quote`, sorted.
    pub fn symbols_for_quote(&self, quote: &str) -> Vec<String> {
        let quote = quote.to_uppercase();
        let mut symbols: Vec<String> = self
            .symbols
            .lock()
            .unwrap()
            .values()
            .filter(|info| info.is_tradable() && info.quote_asset == quote)
            .map(|info| info.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.lock().unwrap().is_empty()
    }
}
