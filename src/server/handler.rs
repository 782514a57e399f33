use super::config::ServerConfig;
use super::registry::ConnectionId;
use crate::{Result, StreamError};
use bytes::{BufMut, BytesMut};
use socket2::SockRef;
use std::io::ErrorKind;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;
use tracing::{debug, info};

const ACK_PREFIX: &[u8] = b"Message received: \"";
const ACK_SUFFIX: &[u8] = b"\"";

/// What a handler reports to the acceptor when it stops
#[derive(Debug)]
pub(crate) enum HandlerEvent {
    /// The peer closed the connection
    Closed(ConnectionId),
    /// Receiving or sending failed
    Failed(ConnectionId, StreamError),
}

/// Builds the reply for one received chunk
///
/// One trailing terminator is stripped from `received`, the rest is quoted
/// after the acknowledgment phrase, and the terminator is appended again.
///
/// ```
/// use tcpline::server::acknowledge;
///
/// let reply = acknowledge(b"hello\n", b'\n');
/// assert_eq!(&reply[..], b"Message received: \"hello\"\n");
/// ```
pub fn acknowledge(received: &[u8], terminator: u8) -> BytesMut {
    let payload = strip_terminator(received, terminator);

    let mut reply = BytesMut::with_capacity(ACK_PREFIX.len() + payload.len() + ACK_SUFFIX.len() + 1);
    reply.put_slice(ACK_PREFIX);
    reply.put_slice(payload);
    reply.put_slice(ACK_SUFFIX);
    reply.put_u8(terminator);
    reply
}

fn strip_terminator(received: &[u8], terminator: u8) -> &[u8] {
    received.strip_suffix(&[terminator]).unwrap_or(received)
}

/// Serves one accepted connection, then reports how it ended
pub(crate) async fn handle_connection(
    id: ConnectionId,
    mut stream: TcpStream,
    config: ServerConfig,
    events: UnboundedSender<HandlerEvent>,
) {
    let event = match serve(&mut stream, &config).await {
        Ok(()) => HandlerEvent::Closed(id),
        Err(e) => HandlerEvent::Failed(id, e),
    };
    // The acceptor only goes away when the server itself is gone
    let _ = events.send(event);
}

async fn serve(stream: &mut TcpStream, config: &ServerConfig) -> Result<()> {
    // SO_RCVTIMEO does not bound tokio's non-blocking reads; the receive
    // loop below wraps each read in `timeout`.
    SockRef::from(&*stream)
        .set_read_timeout(Some(config.receive_timeout))
        .map_err(StreamError::SocketOption)?;

    info!("Incoming connection");

    let mut buffer = vec![0u8; config.buffer_size];
    let capacity = config.buffer_size - 1;

    loop {
        let n = match timeout(config.receive_timeout, stream.read(&mut buffer[..capacity])).await {
            Err(_) => continue,
            Ok(Ok(n)) => n,
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Ok(Err(e)) => return Err(StreamError::Io(e)),
        };

        if n == 0 {
            info!("Connection closed");
            return Ok(());
        }

        let received = &buffer[..n];
        info!(
            size = n,
            payload = %String::from_utf8_lossy(strip_terminator(received, config.terminator)),
            "Rx <<"
        );

        let reply = acknowledge(received, config.terminator);

        stream.write_all(&reply).await?;
        debug!(
            size = reply.len(),
            reply = %String::from_utf8_lossy(&reply[..reply.len() - 1]),
            "Tx >>"
        );
    }
}
