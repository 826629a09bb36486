//! Realtime trade-state synchronization client for the maker backend.
//!
//! Mirrors the server's trade table over a reconnecting WebSocket control
//! channel, multiplexes exchange market data streams across consumers, and
//! issues trade commands over REST. Prices are aligned to each symbol's
//! tick before they go anywhere near an order.

pub mod config;
pub mod control;
pub mod error;
pub mod market;
pub mod models;
pub mod mux;
pub mod pricing;
pub mod rounding;
pub mod socket;
pub mod store;
pub mod view;

pub use error::{Result, TickSyncError};
