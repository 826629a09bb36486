//! Deserialization tests for control-channel and market data model types.

use ticksync::models::symbol::ExchangeInfoResponse;
use ticksync::models::trade::LimitSellType;
use ticksync::models::{
    AggTradeEvent, ControlMessage, DepthEvent, StreamChannel, TickerEvent, TradeStatus,
};

const TRADE_MESSAGE_JSON: &str = include_str!("fixtures/trade_message.json");
const TRADE_ARCHIVED_JSON: &str = include_str!("fixtures/trade_archived.json");
const ACCOUNT_INFO_JSON: &str = include_str!("fixtures/account_info.json");
const NOTICE_JSON: &str = include_str!("fixtures/notice.json");
const VERSION_JSON: &str = include_str!("fixtures/version.json");
const HEALTH_JSON: &str = include_str!("fixtures/health.json");
const COMBINED_TICKER_JSON: &str = include_str!("fixtures/combined_ticker.json");
const AGG_TRADE_JSON: &str = include_str!("fixtures/agg_trade.json");
const DEPTH_JSON: &str = include_str!("fixtures/depth.json");
const EXCHANGE_INFO_JSON: &str = include_str!("fixtures/exchange_info.json");

#[test]
fn test_trade_message_deserializes() {
    let message: ControlMessage =
        serde_json::from_str(TRADE_MESSAGE_JSON).expect("Failed to deserialize trade message");

    let ControlMessage::Trade { trade } = message else {
        panic!("expected a trade message");
    };

    assert_eq!(trade.trade_id, "bhu4t0v22qmlkp0ft9og");
    assert_eq!(trade.symbol, "BTCUSDT");
    assert_eq!(trade.status, TradeStatus::Watching);
    assert_eq!(trade.open_time, "2019-03-01T12:00:00Z");
    assert!(trade.close_time.is_none());
    assert_eq!(trade.fee, 0.001);
    assert_eq!(trade.buy_order.quantity, 1.0);
    assert_eq!(trade.buy_order.price, 3920.5);
    assert_eq!(trade.buy_fill_quantity, 1.0);
    assert_eq!(trade.sellable_quantity, 0.999);
    assert_eq!(trade.effective_buy_price, 3924.42);
    assert!(trade.stop_loss.enabled);
    assert_eq!(trade.stop_loss.percent, 2.5);
    assert!(trade.limit_sell.enabled);
    assert_eq!(trade.limit_sell.sell_type, LimitSellType::Percent);
    assert_eq!(trade.limit_sell.percent, 1.0);
    assert!(!trade.trailing_profit.enabled);
    assert_eq!(trade.last_price, 3930.1);
}

#[test]
fn test_trade_record_with_missing_fields_uses_defaults() {
    let message: ControlMessage = serde_json::from_str(
        r#"{"messageType":"trade","trade":{"TradeID":"t-min","Symbol":"ETHUSDT"}}"#,
    )
    .expect("Failed to deserialize minimal trade");

    let ControlMessage::Trade { trade } = message else {
        panic!("expected a trade message");
    };

    assert_eq!(trade.status, TradeStatus::New);
    assert_eq!(trade.fee, 0.001);
    assert_eq!(trade.buy_fill_quantity, 0.0);
}

#[test]
fn test_trade_archived_deserializes() {
    let message: ControlMessage =
        serde_json::from_str(TRADE_ARCHIVED_JSON).expect("Failed to deserialize archive message");

    let ControlMessage::TradeArchived { trade_id } = message else {
        panic!("expected a tradeArchived message");
    };
    assert_eq!(trade_id, "bhu4t0v22qmlkp0ft9og");
}

#[test]
fn test_account_info_deserializes() {
    let message: ControlMessage =
        serde_json::from_str(ACCOUNT_INFO_JSON).expect("Failed to deserialize account info");

    let ControlMessage::AccountInfo { account } = message else {
        panic!("expected an account info message");
    };

    let balances = account.into_balances();
    assert_eq!(balances.len(), 3);
    let btc = balances.iter().find(|b| b.asset == "BTC").expect("no BTC balance");
    assert_eq!(btc.free, 0.10730886);
    assert_eq!(btc.locked, 0.0);
    let usdt = balances.iter().find(|b| b.asset == "USDT").expect("no USDT balance");
    assert_eq!(usdt.locked, 120.0);
}

#[test]
fn test_notice_deserializes() {
    let message: ControlMessage =
        serde_json::from_str(NOTICE_JSON).expect("Failed to deserialize notice");

    let ControlMessage::Notice { notice } = message else {
        panic!("expected a notice message");
    };
    assert_eq!(notice.level, "error");
    assert!(notice.message.contains("cancel sell order"));
}

#[test]
fn test_version_deserializes() {
    let message: ControlMessage =
        serde_json::from_str(VERSION_JSON).expect("Failed to deserialize version");

    let ControlMessage::Version {
        version,
        git_revision,
    } = message
    else {
        panic!("expected a version message");
    };
    assert_eq!(version, "0.3.0");
    assert_eq!(git_revision.as_deref(), Some("8d15fd5c"));
}

#[test]
fn test_health_deserializes() {
    let message: ControlMessage =
        serde_json::from_str(HEALTH_JSON).expect("Failed to deserialize health");

    let ControlMessage::Health { health } = message else {
        panic!("expected a health message");
    };
    assert_eq!(health.user_socket_state, "connected");
}

#[test]
fn test_unknown_message_type_decodes_to_unknown() {
    let message: ControlMessage =
        serde_json::from_str(r#"{"messageType":"somethingNew","payload":{"x":1}}"#)
            .expect("Failed to deserialize unknown message");

    assert!(matches!(message, ControlMessage::Unknown));
}

#[test]
fn test_combined_ticker_payload_deserializes() {
    // The multiplexer unwraps combined frames to their data payload before
    // consumers see them; decode the payload the same way.
    let frame: serde_json::Value =
        serde_json::from_str(COMBINED_TICKER_JSON).expect("Failed to parse combined frame");
    assert_eq!(frame["stream"], "btcusdt@ticker");

    let ticker: TickerEvent =
        serde_json::from_value(frame["data"].clone()).expect("Failed to deserialize ticker");
    assert_eq!(ticker.symbol, "BTCUSDT");
    assert_eq!(ticker.last_price, 3930.1);
    assert_eq!(ticker.best_bid, 3929.9);
    assert_eq!(ticker.best_ask, 3930.5);
    assert_eq!(ticker.quote_volume, 123456789.12);
    assert_eq!(ticker.percent_change, 1.25);
}

#[test]
fn test_agg_trade_deserializes() {
    let trade: AggTradeEvent =
        serde_json::from_str(AGG_TRADE_JSON).expect("Failed to deserialize agg trade");

    assert_eq!(trade.symbol, "BTCUSDT");
    assert_eq!(trade.price, 3930.1);
    assert_eq!(trade.quantity, 0.25);
    assert_eq!(trade.first_trade_id, 98321401);
    assert_eq!(trade.last_trade_id, 98321405);
    assert_eq!(trade.trade_time, 1551441751120);
    assert!(!trade.buyer_is_maker);
}

#[test]
fn test_depth_deserializes() {
    let depth: DepthEvent =
        serde_json::from_str(DEPTH_JSON).expect("Failed to deserialize depth");

    assert_eq!(depth.last_update_id, 500179346);
    assert_eq!(depth.bids.len(), 3);
    assert_eq!(depth.asks.len(), 3);

    let best_bid = depth.best_bid().expect("no best bid");
    assert_eq!(best_bid.price, 3929.9);
    assert_eq!(best_bid.quantity, 1.25);
    let best_ask = depth.best_ask().expect("no best ask");
    assert_eq!(best_ask.price, 3930.5);
}

#[test]
fn test_exchange_info_flattens_filters() {
    let response: ExchangeInfoResponse =
        serde_json::from_str(EXCHANGE_INFO_JSON).expect("Failed to deserialize exchange info");
    assert_eq!(response.symbols.len(), 2);

    let mut infos = response.symbols.into_iter().map(|raw| raw.into_info());
    let btc = infos.next().expect("missing first symbol");
    assert_eq!(btc.symbol, "BTCUSDT");
    assert!(btc.is_tradable());
    assert_eq!(btc.tick_size, 0.01);
    assert_eq!(btc.step_size, 0.000001);
    assert_eq!(btc.min_quantity, 0.000001);
    assert_eq!(btc.min_notional, 10.0);

    let ven = infos.next().expect("missing second symbol");
    assert_eq!(ven.symbol, "VENBTC");
    assert!(!ven.is_tradable());
    assert_eq!(ven.tick_size, 0.0000001);
}

#[test]
fn test_trade_record_serializes_with_wire_keys() {
    let message: ControlMessage =
        serde_json::from_str(TRADE_MESSAGE_JSON).expect("Failed to deserialize trade message");
    let ControlMessage::Trade { trade } = message else {
        panic!("expected a trade message");
    };

    let value = serde_json::to_value(&trade).expect("Failed to serialize trade");
    assert_eq!(value["TradeID"], "bhu4t0v22qmlkp0ft9og");
    assert_eq!(value["Symbol"], "BTCUSDT");
    assert_eq!(value["Status"], "WATCHING");
    assert_eq!(value["LimitSell"]["Type"], "PERCENT");
    // Absent close time stays absent instead of serializing null.
    assert!(value.get("CloseTime").is_none());
}

#[test]
fn test_stream_keys_lowercase_the_symbol() {
    assert_eq!(StreamChannel::Ticker.stream_key("BTCUSDT"), "btcusdt@ticker");
    assert_eq!(
        StreamChannel::AggTrade.stream_key("ETHUSDT"),
        "ethusdt@aggTrade"
    );
    assert_eq!(StreamChannel::Depth.stream_key("BnbUsdt"), "bnbusdt@depth5");
}
