//! Real API integration tests against the live exchange.
//!
//! These tests hit the public exchange endpoints and require network access.
//! Run with: `cargo test --features integration-tests`

#![cfg(feature = "integration-tests")]

mod common;

use tokio::time::{Duration, timeout};

use ticksync::market::MarketDataClient;

#[tokio::test]
async fn test_fetch_exchange_info_populates_catalog() {
    let market = MarketDataClient::new(&common::exchange_config());

    let count = market
        .fetch_exchange_info()
        .await
        .expect("Failed to fetch exchange info");
    assert!(count > 0, "Exchange info returned no symbols");

    let btc = market
        .catalog()
        .get("BTCUSDT")
        .expect("BTCUSDT missing from catalog");
    assert!(btc.tick_size > 0.0);
    assert!(btc.step_size > 0.0);
    assert!(!market.catalog().tradable_symbols().is_empty());
}

#[tokio::test]
async fn test_ticker_stream_delivers_an_event() {
    let market = MarketDataClient::new(&common::exchange_config());
    let mut stream = market.ticker_stream("BTCUSDT");

    let event = timeout(Duration::from_secs(30), stream.recv())
        .await
        .expect("Timed out waiting for a ticker event")
        .expect("Ticker stream ended unexpectedly");

    assert_eq!(event.symbol, "BTCUSDT");
    assert!(event.last_price > 0.0);
    assert!(event.best_ask >= event.best_bid);
}

#[tokio::test]
async fn test_shared_subscriptions_use_one_connection() {
    let market = MarketDataClient::new(&common::exchange_config());

    let mut first = market.agg_trade_stream("BTCUSDT");
    let _second = market.agg_trade_stream("BTCUSDT");
    assert_eq!(market.active_stream_count(), 1);

    // Trades may be sparse; accept either an event or a quiet timeout, the
    // stream count is the property under test.
    let _ = timeout(Duration::from_secs(10), first.recv()).await;
    assert_eq!(market.active_stream_count(), 1);
}

#[tokio::test]
async fn test_book_ticker_returns_a_spread() {
    let market = MarketDataClient::new(&common::exchange_config());

    let book = market
        .book_ticker("BTCUSDT")
        .await
        .expect("Failed to fetch book ticker");
    assert_eq!(book.symbol, "BTCUSDT");
    assert!(book.bid_price > 0.0);
    assert!(book.ask_price >= book.bid_price);
}
