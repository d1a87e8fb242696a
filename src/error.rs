//! Crate-wide error type.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    /// No cached value is present yet for a requested slot.
    #[error("No data available")]
    CacheMiss,

    /// A `getPrices` request named a coin that isn't in the mids snapshot.
    #[error("Coin not found: {0}")]
    UnknownCoin(String),

    /// The IPC method name in a request wasn't recognized.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// `server start` was called while a live daemon already holds the pid file.
    #[error("server is already running (pid {0})")]
    AlreadyRunning(u32),

    /// `server stop`/`server status` was called with no daemon listening.
    #[error("server is not running")]
    NotRunning,

    /// An IPC client request was not answered within its deadline.
    #[error("Request timeout")]
    RequestTimeout,

    /// The IPC connection dropped before a response arrived, or after `shutdown`.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The daemon failed to become ready (socket never appeared) within the startup deadline.
    #[error("server did not become ready in time")]
    StartupTimeout,

    #[error("{0}")]
    Other(String),
}
