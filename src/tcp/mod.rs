pub mod config;
pub mod connection;
pub mod tests;

pub use config::{ConnectionConfig, MINIMUM_PORT};
pub use connection::{ConnectionState, TcpConnection};
