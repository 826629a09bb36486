//! Client for the backend's realtime control channel.
//!
//! [`ControlChannelClient`] owns the reconnecting socket to the server,
//! feeds every inbound frame through the dispatcher into the trade store
//! and the balance/health cells, and issues trade commands over REST.
//! Commands are fire-and-forget: the server's answer arrives as a trade
//! update on the socket, and failures surface as local notices.

pub mod commands;
mod dispatch;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

pub use commands::{
    BuyOrderResponse, CommandClient, OpenTradeOptions, SESSION_HEADER, VersionInfo,
};

use crate::config::ServerConfig;
use crate::error::{Result, TickSyncError};
use crate::models::{AggTradeEvent, AssetBalance, HealthState, NoticeEvent};
use crate::socket::{ConnectionState, ReconnectingSocket, SocketEvent};
use crate::store::TradeStore;
use dispatch::Dispatcher;

const NOTICE_CAPACITY: usize = 64;
const MARKET_TRADE_CAPACITY: usize = 512;

pub struct ControlChannelClient {
    socket: ReconnectingSocket,
    store: Arc<TradeStore>,
    commands: CommandClient,
    notices: broadcast::Sender<NoticeEvent>,
    market_trades: broadcast::Sender<AggTradeEvent>,
    balances: watch::Receiver<Vec<AssetBalance>>,
    health: watch::Receiver<Option<HealthState>>,
}

impl ControlChannelClient {
    /// Connects to the server's realtime channel and starts the dispatch
    /// loop. The socket reconnects on its own until [`shutdown`].
    ///
    /// [`shutdown`]: ControlChannelClient::shutdown
    pub fn connect(config: &ServerConfig) -> Self {
        let socket = ReconnectingSocket::spawn(config.websocket_url());
        let store = Arc::new(TradeStore::new());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let (market_trades, _) = broadcast::channel(MARKET_TRADE_CAPACITY);
        let (balances_tx, balances_rx) = watch::channel(Vec::new());
        let (health_tx, health_rx) = watch::channel(None);

        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            notices.clone(),
            balances_tx,
            market_trades.clone(),
            health_tx,
        );

        let mut events = socket.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SocketEvent::Frame(value)) => dispatcher.dispatch(value),
                    Ok(SocketEvent::State(state)) => {
                        debug!(state = state.as_str(), "Control channel state");
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Control dispatch lagging, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        Self {
            socket,
            store,
            commands: CommandClient::new(config.url.clone(), config.session_id.clone()),
            notices,
            market_trades,
            balances: balances_rx,
            health: health_rx,
        }
    }

    pub fn store(&self) -> Arc<TradeStore> {
        Arc::clone(&self.store)
    }

    /// Watch cell holding the socket's connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.socket.state()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.socket.current_state()
    }

    /// Server and local command notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<NoticeEvent> {
        self.notices.subscribe()
    }

    /// Market trades the server relays from the exchange.
    pub fn subscribe_market_trades(&self) -> broadcast::Receiver<AggTradeEvent> {
        self.market_trades.subscribe()
    }

    /// Watch cell holding the latest account balances.
    pub fn balances(&self) -> watch::Receiver<Vec<AssetBalance>> {
        self.balances.clone()
    }

    /// Watch cell holding the latest backend health snapshot.
    pub fn health(&self) -> watch::Receiver<Option<HealthState>> {
        self.health.clone()
    }

    /// Direct access to the REST command client, for callers that want the
    /// response instead of fire-and-forget.
    pub fn commands(&self) -> &CommandClient {
        &self.commands
    }

    /// Stops the socket and the dispatch loop.
    pub fn shutdown(&self) {
        self.socket.shutdown();
    }

    /// Checks the server's version against this build. A mismatch means the
    /// wire format may have moved on and this client should be updated.
    pub async fn verify_server_version(&self) -> Result<VersionInfo> {
        let info = self.commands.get_version().await?;
        let client = env!("CARGO_PKG_VERSION");
        if info.version != client {
            return Err(TickSyncError::StaleClient {
                server: info.version,
                client: client.to_string(),
            });
        }
        Ok(info)
    }

    pub fn open_trade(&self, options: OpenTradeOptions) {
        let commands = self.commands.clone();
        self.spawn_command("open trade", async move {
            commands.open_trade(&options).await
        });
    }

    pub fn cancel_buy(&self, trade_id: &str) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("cancel buy", async move {
            commands.cancel_buy(&trade_id).await
        });
    }

    pub fn cancel_sell(&self, trade_id: &str) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("cancel sell", async move {
            commands.cancel_sell(&trade_id).await
        });
    }

    pub fn update_stop_loss(&self, trade_id: &str, enable: bool, percent: f64) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("update stop loss", async move {
            commands.update_stop_loss(&trade_id, enable, percent).await
        });
    }

    pub fn update_trailing_profit(&self, trade_id: &str, enable: bool, percent: f64, deviation: f64) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("update trailing profit", async move {
            commands
                .update_trailing_profit(&trade_id, enable, percent, deviation)
                .await
        });
    }

    pub fn limit_sell_by_percent(&self, trade_id: &str, percent: f64) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("limit sell", async move {
            commands.limit_sell_by_percent(&trade_id, percent).await
        });
    }

    pub fn limit_sell_by_price(&self, trade_id: &str, price: f64) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("limit sell", async move {
            commands.limit_sell_by_price(&trade_id, price).await
        });
    }

    pub fn market_sell(&self, trade_id: &str) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("market sell", async move {
            commands.market_sell(&trade_id).await
        });
    }

    pub fn archive(&self, trade_id: &str) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("archive", async move { commands.archive(&trade_id).await });
    }

    pub fn abandon(&self, trade_id: &str) {
        let commands = self.commands.clone();
        let trade_id = trade_id.to_string();
        self.spawn_command("abandon", async move { commands.abandon(&trade_id).await });
    }

    /// Archives every trade that has finished: done, canceled, or failed.
    /// Abandoned trades stay visible until archived individually.
    pub fn archive_finished(&self) {
        use crate::models::TradeStatus;

        for trade in self.store.snapshot() {
            match trade.status {
                TradeStatus::Done | TradeStatus::Canceled | TradeStatus::Failed => {
                    self.archive(&trade.trade_id);
                }
                _ => {}
            }
        }
    }

    /// Runs a command in the background; failures become error notices so
    /// the caller never has to await the round trip.
    fn spawn_command<T, F>(&self, action: &'static str, fut: F)
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let notices = self.notices.clone();
        tokio::spawn(async move {
            if let Err(e) = fut.await {
                warn!(action, error = %e, "Command failed");
                let _ = notices.send(NoticeEvent::error(format!("{action} failed: {e}")));
            }
        });
    }
}
