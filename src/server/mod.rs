//! Acknowledging line echo server
//!
//! The [`Acceptor`] owns the listening socket and the
//! [`ConnectionRegistry`]; every accepted connection gets its own handler
//! task, which reports back to the acceptor over a channel when it ends.

pub mod acceptor;
pub mod config;
pub mod handler;
pub mod registry;

pub use acceptor::{Acceptor, ServerHandle};
pub use config::ServerConfig;
pub use handler::acknowledge;
pub use registry::{ConnectionId, ConnectionInfo, ConnectionRegistry};
