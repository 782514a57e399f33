use std::time::Duration;

/// Lowest port a connection or server may use
pub const MINIMUM_PORT: u16 = 1024;

/// Client-side connection settings
///
/// # Examples
///
/// ```
/// use tcpline::tcp::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::default()
///     .with_read_timeout(Duration::from_millis(250))
///     .with_terminator(b'\r');
/// assert_eq!(config.read_timeout, Duration::from_millis(250));
/// assert_eq!(config.write_timeout, Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Longest a single `read()` waits for data before reporting `NoData`
    pub read_timeout: Duration,
    /// Wall-clock budget for one `write()` call
    pub write_timeout: Duration,
    /// Byte that ends a line
    pub terminator: u8,
}

impl ConnectionConfig {
    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the line terminator
    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            write_timeout: Duration::from_millis(1000),
            terminator: b'\n',
        }
    }
}
