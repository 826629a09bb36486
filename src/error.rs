//! Crate-level error types.
//!
//! [`TickSyncError`] unifies every error source (configuration, transport,
//! HTTP, decoding, command handling) behind a single enum so callers can
//! match on the variant they care about while still using the `?` operator
//! for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TickSyncError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum TickSyncError {
    /// An environment variable was missing or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// An HTTP request to the backend or the exchange failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A signal or socket-level I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No exchange metadata is cached for the requested symbol.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Rounding step sizes must be strictly positive.
    #[error("invalid step size: {0}")]
    InvalidStepSize(f64),

    /// No price has been observed yet for the requested symbol.
    #[error("no price available for {0}")]
    PriceUnavailable(String),

    /// The backend refused a command request.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The backend reports a different build than this client.
    #[error("server version {server} does not match client version {client}")]
    StaleClient { server: String, client: String },
}
