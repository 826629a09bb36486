//! Control-channel message envelope.
//!
//! Every frame on the backend realtime channel is an object tagged by
//! `messageType`; the payload field depends on the tag. Unknown tags decode
//! into [`ControlMessage::Unknown`] so new server-side message types never
//! break the dispatch loop.

use serde::Deserialize;

use super::agg_trade::AggTradeEvent;
use super::balance::AccountInfoEvent;
use super::trade::TradeRecord;

/// A decoded control-channel message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "messageType")]
pub enum ControlMessage {
    /// A trade was created or updated.
    #[serde(rename = "trade")]
    Trade { trade: TradeRecord },

    /// A trade was archived and should drop out of the local store.
    #[serde(rename = "tradeArchived")]
    TradeArchived {
        #[serde(rename = "tradeId")]
        trade_id: String,
    },

    /// A market trade relayed from the exchange's aggregated trade stream.
    #[serde(rename = "binanceAggTrade")]
    MarketTrade {
        #[serde(rename = "binanceAggTrade")]
        trade: AggTradeEvent,
    },

    /// Account balances relayed from the exchange's user-data stream.
    #[serde(rename = "binanceOutboundAccountInfo")]
    AccountInfo {
        #[serde(rename = "binanceOutboundAccountInfo")]
        account: AccountInfoEvent,
    },

    /// Server build identity, sent once on connect.
    #[serde(rename = "version")]
    Version {
        version: String,
        #[serde(default)]
        git_revision: Option<String>,
    },

    /// Free-text operator notification.
    #[serde(rename = "notice")]
    Notice { notice: NoticeEvent },

    /// Backend health state.
    #[serde(rename = "health")]
    Health { health: HealthState },

    #[serde(other)]
    Unknown,
}

/// Severity classes for operator notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// An operator notification from the server or a failed local command.
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeEvent {
    /// Wire severity: `"info"`, `"warning"`, or `"error"`.
    #[serde(default)]
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl NoticeEvent {
    /// Builds a local error notice, as used for rejected commands.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Builds a local warning notice.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Maps the wire severity onto [`NoticeLevel`]; unrecognized values
    /// are treated as warnings.
    pub fn severity(&self) -> NoticeLevel {
        match self.level.as_str() {
            "error" => NoticeLevel::Error,
            "info" => NoticeLevel::Info,
            _ => NoticeLevel::Warning,
        }
    }
}

/// Backend health snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthState {
    /// State of the backend's exchange user-data socket.
    #[serde(rename = "binanceUserSocketState", default)]
    pub user_socket_state: String,
}
