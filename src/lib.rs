use thiserror::Error;

/// Error types for the tcpline library
#[derive(Error, Debug)]
pub enum StreamError {
    /// Invalid port, or an attempt to reconnect/reconfigure a live connection
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Host/port could not be resolved to any socket address
    #[error("Failed to resolve [{host}:{port}]: {reason}")]
    AddressResolution {
        host: String,
        port: u16,
        reason: String,
    },

    /// The OS refused to create a socket
    #[error("Socket creation error: {0}")]
    SocketCreation(std::io::Error),

    /// Connecting to the remote endpoint failed
    #[error("Failed to connect to [{host}:{port}]: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Binding or listening on a local address failed
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Setting a socket option (address reuse, timeouts) failed
    #[error("Socket option error: {0}")]
    SocketOption(std::io::Error),

    /// Send/receive failures that are not a timeout
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer performed an orderly shutdown
    #[error("Connection closed by peer {0}")]
    ConnectionClosed(String),
}

/// Result type for the tcpline library
pub type Result<T> = std::result::Result<T, StreamError>;

pub mod client;
pub mod logging;
pub mod network;
pub mod server;
pub mod stream;
pub mod tcp;

// Re-export main types for convenience
pub use client::Driver;
pub use network::resolve;
pub use server::{Acceptor, ServerConfig, ServerHandle};
pub use stream::{ByteStream, LineStream, MemoryStream, ReadOutcome};
pub use tcp::{ConnectionConfig, ConnectionState, TcpConnection};
