//! Error types for DrishtiLink

use std::net::SocketAddr;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DrishtiLink error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hostname could not be resolved
    #[error("could not resolve {host}: {source}")]
    Resolution {
        /// Hostname that failed to resolve
        host: String,
        /// Underlying resolver error
        source: std::io::Error,
    },

    /// No usable interface for broadcast discovery
    #[error("no broadcast-capable network interface found")]
    NoBroadcastInterface,

    /// Local bind failed
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Outbound connection failed
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address the connection was attempted to
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Peer closed the connection mid-read
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Buffer ended before the declared data did
    #[error("truncated data: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the operation required
        needed: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Invalid packet or field contents
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// Operation not valid for this socket role
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Configuration file could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("configuration error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
