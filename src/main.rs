use std::sync::Arc;

use ticksync::TickSyncError;
use ticksync::config::fetch_config;
use ticksync::control::ControlChannelClient;
use ticksync::market::MarketDataClient;
use ticksync::models::NoticeLevel;
use ticksync::pricing::PriceEngine;
use ticksync::view::build_rows;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), TickSyncError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;

    let market = Arc::new(MarketDataClient::new(&app_config.exchange));
    if let Err(e) = market.fetch_exchange_info().await {
        warn!(error = %e, "Exchange info unavailable, price adjustment disabled");
    }
    let engine = Arc::new(PriceEngine::new(Arc::clone(&market)));

    let control = ControlChannelClient::connect(&app_config.server);
    match control.verify_server_version().await {
        Ok(info) => info!(version = %info.version, "Server version matches"),
        Err(TickSyncError::StaleClient { server, client }) => {
            warn!(server, client, "Server version differs, consider updating");
        }
        Err(e) => warn!(error = %e, "Could not fetch server version"),
    }

    // Feed the price engine from each configured symbol's trade stream.
    for symbol in &app_config.symbols {
        let mut trades = market.agg_trade_stream(symbol);
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            while let Some(trade) = trades.recv().await {
                engine.record_trade(&trade.symbol, trade.price);
            }
        });

        let mut tickers = market.ticker_stream(symbol);
        tokio::spawn(async move {
            while let Some(ticker) = tickers.recv().await {
                debug!(
                    symbol = %ticker.symbol,
                    last = ticker.last_price,
                    bid = ticker.best_bid,
                    ask = ticker.best_ask,
                    "Ticker"
                );
            }
        });
    }

    // Trades the server relays cover symbols with open trades, which may
    // not be in the configured set.
    {
        let mut relayed = control.subscribe_market_trades();
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            loop {
                match relayed.recv().await {
                    Ok(trade) => engine.record_trade(&trade.symbol, trade.price),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
    }

    {
        let mut snapshots = control.store().subscribe_snapshots();
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            loop {
                match snapshots.recv().await {
                    Ok(snapshot) => {
                        let rows = build_rows(snapshot, &engine.price_map());
                        info!(open_trades = rows.len(), "Trade snapshot");
                        for row in &rows {
                            info!(
                                trade_id = %row.trade.trade_id,
                                symbol = %row.trade.symbol,
                                status = ?row.trade.status,
                                profit_percent = row.profit_percent(),
                                "Trade"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
    }

    {
        let mut notices = control.subscribe_notices();
        tokio::spawn(async move {
            loop {
                match notices.recv().await {
                    Ok(notice) => match notice.severity() {
                        NoticeLevel::Error => error!(message = %notice.message, "Notice"),
                        NoticeLevel::Warning => warn!(message = %notice.message, "Notice"),
                        NoticeLevel::Info => info!(message = %notice.message, "Notice"),
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
    }

    {
        let mut state = control.state();
        tokio::spawn(async move {
            loop {
                let current = *state.borrow_and_update();
                info!(state = current.as_str(), "Control channel");
                if state.changed().await.is_err() {
                    return;
                }
            }
        });
    }

    {
        let mut balances = control.balances();
        tokio::spawn(async move {
            while balances.changed().await.is_ok() {
                let snapshot = balances.borrow().clone();
                info!(assets = snapshot.len(), "Balance update");
                for balance in &snapshot {
                    debug!(
                        asset = %balance.asset,
                        free = balance.free,
                        locked = balance.locked,
                        "Balance"
                    );
                }
            }
        });
    }

    {
        let mut health = control.health();
        tokio::spawn(async move {
            while health.changed().await.is_ok() {
                let state = health.borrow().clone();
                if let Some(state) = state {
                    info!(user_socket = %state.user_socket_state, "Backend health");
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    control.shutdown();

    Ok(())
}
