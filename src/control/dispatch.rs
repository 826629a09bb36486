//! Routing of decoded control-channel frames into client-side state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::models::{
    AggTradeEvent, AssetBalance, ControlMessage, HealthState, NoticeEvent,
};
use crate::store::TradeStore;

/// Applies each control message to the store, the balance and health cells,
/// or the relay channels.
pub(crate) struct Dispatcher {
    store: Arc<TradeStore>,
    notices: broadcast::Sender<NoticeEvent>,
    balances: watch::Sender<Vec<AssetBalance>>,
    market_trades: broadcast::Sender<AggTradeEvent>,
    health: watch::Sender<Option<HealthState>>,
    stale_notified: AtomicBool,
}

impl Dispatcher {
    pub(crate) fn new(
        store: Arc<TradeStore>,
        notices: broadcast::Sender<NoticeEvent>,
        balances: watch::Sender<Vec<AssetBalance>>,
        market_trades: broadcast::Sender<AggTradeEvent>,
        health: watch::Sender<Option<HealthState>>,
    ) -> Self {
        Self {
            store,
            notices,
            balances,
            market_trades,
            health,
            stale_notified: AtomicBool::new(false),
        }
    }

    pub(crate) fn dispatch(&self, value: Value) {
        // Keep the tag around for logging before the value is consumed.
        let message_type = value
            .get("messageType")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let message = match serde_json::from_value::<ControlMessage>(value) {
            Ok(message) => message,
            Err(e) => {
                warn!(message_type = %message_type, error = %e, "Dropping undecodable control message");
                return;
            }
        };

        match message {
            ControlMessage::Trade { trade } => {
                debug!(
                    trade_id = %trade.trade_id,
                    symbol = %trade.symbol,
                    status = ?trade.status,
                    "Trade update"
                );
                self.store.upsert(trade);
            }
            ControlMessage::TradeArchived { trade_id } => {
                debug!(trade_id = %trade_id, "Trade archived");
                self.store.archive(&trade_id);
            }
            ControlMessage::MarketTrade { trade } => {
                let _ = self.market_trades.send(trade);
            }
            ControlMessage::AccountInfo { account } => {
                self.balances.send_replace(account.into_balances());
            }
            ControlMessage::Version {
                version,
                git_revision,
            } => {
                debug!(
                    version = %version,
                    git_revision = git_revision.as_deref().unwrap_or(""),
                    "Server version"
                );
                self.check_version(&version);
            }
            ControlMessage::Notice { notice } => {
                info!(level = %notice.level, message = %notice.message, "Server notice");
                let _ = self.notices.send(notice);
            }
            ControlMessage::Health { health } => {
                self.health.send_replace(Some(health));
            }
            ControlMessage::Unknown => {
                warn!(message_type = %message_type, "Unhandled message type");
            }
        }
    }

    /// Raises a single advisory notice when the server version does not
    /// match this build.
    fn check_version(&self, server_version: &str) {
        let client_version = env!("CARGO_PKG_VERSION");
        if server_version == client_version {
            return;
        }
        if self.stale_notified.swap(true, Ordering::Relaxed) {
            return;
        }
        warn!(
            server = server_version,
            client = client_version,
            "Server version differs from this client"
        );
        let _ = self.notices.send(NoticeEvent::warning(format!(
            "server runs {server_version} but this client was built for {client_version}"
        )));
    }
}
