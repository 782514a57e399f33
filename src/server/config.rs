use crate::network::DEFAULT_BACKLOG;
use crate::tcp::MINIMUM_PORT;
use crate::{Result, StreamError};
use std::time::Duration;

/// Configuration for the line echo server
///
/// # Examples
///
/// ```
/// use tcpline::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1", 5555)
///     .with_receive_timeout(Duration::from_millis(500));
/// assert_eq!(config.backlog, 10);
/// assert_eq!(config.buffer_size, 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or address to bind to
    pub host: String,
    /// Port to bind to; 0 asks the OS for an ephemeral port
    pub port: u16,
    /// Pending connections queued before `accept`
    pub backlog: i32,
    /// Receive buffer per connection; one byte is kept in reserve
    pub buffer_size: usize,
    /// How long a handler waits in one receive before trying again
    pub receive_timeout: Duration,
    /// Byte that ends a line
    pub terminator: u8,
}

impl ServerConfig {
    /// Create a new configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            backlog: DEFAULT_BACKLOG,
            buffer_size: 1024,
            receive_timeout: Duration::from_millis(1500),
            terminator: b'\n',
        }
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the per-connection receive buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the receive timeout
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set the line terminator
    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    /// Checks the port, backlog and buffer size
    pub fn validate(&self) -> Result<()> {
        if self.port != 0 && self.port < MINIMUM_PORT {
            return Err(StreamError::Configuration(format!(
                "Port number may not be less than {MINIMUM_PORT} ({} < {MINIMUM_PORT})",
                self.port
            )));
        }
        if self.backlog < 1 {
            return Err(StreamError::Configuration(format!(
                "Backlog must be at least 1 (got {})",
                self.backlog
            )));
        }
        if self.buffer_size < 2 {
            return Err(StreamError::Configuration(format!(
                "Buffer size must be at least 2 bytes (got {})",
                self.buffer_size
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 0)
    }
}
