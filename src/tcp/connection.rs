use super::config::{ConnectionConfig, MINIMUM_PORT};
use crate::network::resolve;
use crate::stream::{ByteStream, ReadOutcome};
use crate::{Result, StreamError};
use async_trait::async_trait;
use socket2::SockRef;
use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

/// Bytes requested from the socket per receive
const RECEIVE_CHUNK: usize = 8192;

/// Lifecycle of a [`TcpConnection`]
///
/// `Closed` is terminal: a closed instance never reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Disconnected,
    /// Holding a live socket
    Connected,
    /// Disconnected locally or shut down by the peer
    Closed,
}

/// Client-side TCP connection exposing the [`ByteStream`] capability
///
/// Reads are served one byte at a time from an internal buffer that is
/// refilled with one bulk receive whenever it runs dry. The socket is owned
/// by the connection and released whenever it is dropped, disconnected, or
/// closed by the peer.
///
/// # Examples
///
/// ```no_run
/// use tcpline::{ByteStream, LineStream, TcpConnection};
/// use tcpline::stream::LineOutcome;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut connection = TcpConnection::new("127.0.0.1", 5555)?;
///     connection.connect().await?;
///
///     connection.write_line(b"hello", b'\n').await?;
///     if let LineOutcome::Line(reply) = connection.read_line(b'\n').await? {
///         println!("{}", String::from_utf8_lossy(&reply));
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct TcpConnection {
    socket: Option<TcpStream>,
    host: String,
    port: u16,
    pending: VecDeque<u8>,
    receive_buffer: Vec<u8>,
    config: ConnectionConfig,
    state: ConnectionState,
}

impl TcpConnection {
    /// Creates an unconnected instance with default timeouts
    ///
    /// Fails with [`StreamError::Configuration`] if `port` is below 1024.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(host, port, ConnectionConfig::default())
    }

    /// Creates an unconnected instance with the given settings
    pub fn with_config(host: impl Into<String>, port: u16, config: ConnectionConfig) -> Result<Self> {
        check_port(port)?;
        Ok(Self {
            socket: None,
            host: host.into(),
            port,
            pending: VecDeque::new(),
            receive_buffer: vec![0; RECEIVE_CHUNK],
            config,
            state: ConnectionState::Disconnected,
        })
    }

    /// Connects to the configured host and port
    ///
    /// Every address the resolver returns is tried in order until one
    /// accepts. Once connected, the pending buffer is cleared and the read
    /// and write timeouts are applied to the socket.
    pub async fn connect(&mut self) -> Result<()> {
        self.ensure_reconfigurable("connect")?;
        if self.state == ConnectionState::Closed {
            return Err(StreamError::Configuration(format!(
                "Connection to {} is closed; create a new TcpConnection to reconnect",
                self.port_name()
            )));
        }

        let addrs = resolve(&self.host, self.port).await?;
        let stream = connect_first(&self.host, self.port, &addrs, open_socket).await?;

        self.pending.clear();
        // A failure here drops `stream`, which closes it
        apply_timeouts(&stream, &self.config)?;

        self.socket = Some(stream);
        self.state = ConnectionState::Connected;
        info!(peer = %self.port_name(), "Connected");
        Ok(())
    }

    /// Points the instance at a new host and port, then connects
    pub async fn connect_to(&mut self, host: impl Into<String>, port: u16) -> Result<()> {
        self.ensure_reconfigurable("connect")?;
        check_port(port)?;
        self.host = host.into();
        self.port = port;
        self.connect().await
    }

    /// Closes the socket and drops any buffered bytes
    ///
    /// Safe to call any number of times, connected or not.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.socket.take() {
            drop(stream);
            self.state = ConnectionState::Closed;
            info!(peer = %self.port_name(), "Disconnected");
        }
        self.pending.clear();
    }

    /// Returns true while a socket is held
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Remote host name as configured
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote port as configured
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Timeouts and terminator in use
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Address of the connected peer
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|stream| stream.peer_addr().ok())
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> Result<()> {
        self.ensure_reconfigurable("set the host name")?;
        self.host = host.into();
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<()> {
        self.ensure_reconfigurable("set the port number")?;
        check_port(port)?;
        self.port = port;
        Ok(())
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_reconfigurable("set the read timeout")?;
        self.config.read_timeout = timeout;
        Ok(())
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_reconfigurable("set the write timeout")?;
        self.config.write_timeout = timeout;
        Ok(())
    }

    fn ensure_reconfigurable(&self, action: &str) -> Result<()> {
        if self.is_connected() {
            return Err(StreamError::Configuration(format!(
                "Cannot {action} while connected to {} (call disconnect() first)",
                self.port_name()
            )));
        }
        Ok(())
    }

    fn mark_peer_closed(&mut self) {
        self.socket = None;
        self.state = ConnectionState::Closed;
        info!(peer = %self.port_name(), "Peer closed connection");
    }
}

#[async_trait]
impl ByteStream for TcpConnection {
    async fn read(&mut self) -> Result<ReadOutcome> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(ReadOutcome::Byte(byte));
        }

        let Some(stream) = self.socket.as_ref() else {
            return match self.state {
                ConnectionState::Closed => Ok(ReadOutcome::EndOfStream),
                _ => Err(StreamError::Configuration(format!(
                    "Cannot read from {} before connect()",
                    self.port_name()
                ))),
            };
        };

        match timeout(self.config.read_timeout, stream.readable()).await {
            Err(_) => return Ok(ReadOutcome::NoData),
            Ok(Err(e)) => return Err(StreamError::Io(e)),
            Ok(Ok(())) => {}
        }

        match stream.try_read(&mut self.receive_buffer) {
            Ok(0) => {
                self.mark_peer_closed();
                Err(StreamError::ConnectionClosed(self.port_name()))
            }
            Ok(n) => {
                self.pending.extend(&self.receive_buffer[..n]);
                Ok(self
                    .pending
                    .pop_front()
                    .map_or(ReadOutcome::NoData, ReadOutcome::Byte))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(ReadOutcome::NoData)
            }
            Err(e) => Err(StreamError::Io(e)),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let Some(stream) = self.socket.as_ref() else {
            return Err(StreamError::Configuration(format!(
                "Cannot write on closed socket {} (call connect() first)",
                self.port_name()
            )));
        };

        let deadline = Instant::now() + self.config.write_timeout;
        let mut sent = 0;
        while sent < bytes.len() {
            match timeout_at(deadline, stream.writable()).await {
                Err(_) => break,
                Ok(Err(e)) => return Err(StreamError::Io(e)),
                Ok(Ok(())) => {}
            }

            match stream.try_write(&bytes[sent..]) {
                Ok(0) => return Err(StreamError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => sent += n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => return Err(StreamError::Io(e)),
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        if sent < bytes.len() {
            warn!(
                peer = %self.port_name(),
                sent,
                requested = bytes.len(),
                "Write timeout elapsed before all bytes were sent"
            );
        }
        Ok(sent)
    }

    fn put_back(&mut self, byte: u8) {
        self.pending.push_front(byte);
    }

    async fn open(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.connect().await
    }

    fn close(&mut self) {
        self.disconnect();
    }

    /// Does nothing: TCP sends are handed straight to the kernel
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_connected()
    }

    fn port_name(&self) -> String {
        format!("[{}:{}]", self.host, self.port)
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn check_port(port: u16) -> Result<()> {
    if port < MINIMUM_PORT {
        return Err(StreamError::Configuration(format!(
            "Port number cannot be less than {MINIMUM_PORT} ({port} < {MINIMUM_PORT})"
        )));
    }
    Ok(())
}

/// Connects to the first address in `addrs` that accepts
///
/// An address whose socket cannot be opened is skipped like one that
/// refuses the connection. When every address fails, the last error is
/// returned.
pub(crate) async fn connect_first<F>(
    host: &str,
    port: u16,
    addrs: &[SocketAddr],
    open: F,
) -> Result<TcpStream>
where
    F: Fn(SocketAddr) -> Result<TcpSocket>,
{
    let mut last_error = None;
    for &addr in addrs {
        let socket = match open(addr) {
            Ok(socket) => socket,
            Err(e) => {
                debug!(%addr, error = %e, "Could not open socket");
                last_error = Some(e);
                continue;
            }
        };
        match socket.connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(StreamError::Connect {
                    host: host.to_string(),
                    port,
                    source: e,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| StreamError::Connect {
        host: host.to_string(),
        port,
        source: io::Error::new(ErrorKind::NotFound, "no address to connect to"),
    }))
}

pub(crate) fn open_socket(addr: SocketAddr) -> Result<TcpSocket> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(StreamError::SocketCreation)?;

    socket.set_reuseaddr(true).map_err(StreamError::SocketOption)?;
    Ok(socket)
}

// SO_RCVTIMEO/SO_SNDTIMEO do not bound tokio's non-blocking I/O; `read` and
// `write` enforce the timeouts themselves.
fn apply_timeouts(stream: &TcpStream, config: &ConnectionConfig) -> Result<()> {
    let socket = SockRef::from(stream);
    socket
        .set_read_timeout(Some(config.read_timeout))
        .map_err(StreamError::SocketOption)?;
    socket
        .set_write_timeout(Some(config.write_timeout))
        .map_err(StreamError::SocketOption)?;
    Ok(())
}
