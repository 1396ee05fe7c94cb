use std::net::SocketAddr;

/// Errors that can occur while publishing frames.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// A snapshot could not be encoded.
    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to bind the WebSocket listener.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// WebSocket handshake or protocol error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Other socket-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BroadcastError>;
