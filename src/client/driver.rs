use crate::stream::{ByteStream, LineOutcome, LineStream, ReadOutcome};
use crate::tcp::TcpConnection;
use crate::{Result, StreamError};
use std::io::{self, ErrorKind};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const RX_MARKER: &[u8] = b"Rx << ";

/// What the input and connection tasks hand to the consumer
#[derive(Debug)]
enum DriverEvent {
    Local(Vec<u8>),
    LocalEnded,
    LocalFailed(io::Error),
    Remote(Vec<u8>),
}

/// Client loop pairing local input with a remote line stream
///
/// One task reads local input. A second task owns the stream: it waits for
/// remote lines and sends local ones as soon as they arrive, without waiting
/// out a read timeout. Both report to a single consumer, which owns the
/// output.
pub struct Driver<S = TcpConnection> {
    connection: Arc<Mutex<S>>,
    terminator: u8,
}

impl<S: ByteStream + 'static> Driver<S> {
    pub fn new(stream: S, terminator: u8) -> Self {
        Self {
            connection: Arc::new(Mutex::new(stream)),
            terminator,
        }
    }

    /// Shared access to the underlying stream
    ///
    /// The connection task holds the lock while [`run`](Self::run) is active.
    pub fn connection(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.connection)
    }

    /// Runs until local input ends (`Ok`) or the remote side fails (`Err`)
    ///
    /// Lines typed before local input ends are all sent before `Ok` is
    /// returned.
    pub async fn run<I, O>(self, input: I, mut output: O) -> Result<()>
    where
        I: AsyncBufRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
    {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let local = tokio::spawn(read_local(input, events_tx.clone()));
        let mut remote = tokio::spawn(drive_connection(
            Arc::clone(&self.connection),
            self.terminator,
            outgoing_rx,
            events_tx,
        ));

        let result = consume(&mut events_rx, outgoing_tx, &mut remote, &mut output).await;

        local.abort();
        remote.abort();
        result
    }
}

async fn consume<O: AsyncWrite + Unpin>(
    events: &mut mpsc::UnboundedReceiver<DriverEvent>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    remote: &mut JoinHandle<Result<()>>,
    output: &mut O,
) -> Result<()> {
    loop {
        tokio::select! {
            // Remote lines queued before the connection task ended are printed first
            biased;
            Some(event) = events.recv() => match event {
                DriverEvent::Remote(line) => {
                    output.write_all(RX_MARKER).await?;
                    output.write_all(&line).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                }
                // A send error means the connection task ended; its join reports why
                DriverEvent::Local(line) => {
                    let _ = outgoing.send(line);
                }
                DriverEvent::LocalEnded => {
                    info!("Local input closed");
                    drop(outgoing);
                    return joined(remote.await);
                }
                DriverEvent::LocalFailed(e) => return Err(StreamError::Io(e)),
            },
            finished = &mut *remote => return match joined(finished) {
                // Only a closed outgoing queue ends the task cleanly
                Ok(()) => Err(StreamError::ConnectionClosed("connection task stopped".to_string())),
                Err(e) => Err(e),
            },
        }
    }
}

fn joined(finished: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    finished.map_err(|e| StreamError::Io(io::Error::other(e)))?
}

async fn read_local<I: AsyncBufRead + Unpin>(
    mut input: I,
    events: mpsc::UnboundedSender<DriverEvent>,
) {
    loop {
        let mut line = Vec::new();
        let event = match input.read_until(b'\n', &mut line).await {
            Ok(0) => DriverEvent::LocalEnded,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                DriverEvent::Local(line)
            }
            Err(e) => DriverEvent::LocalFailed(e),
        };
        let last = !matches!(event, DriverEvent::Local(_));
        if events.send(event).is_err() || last {
            return;
        }
    }
}

/// Owns the stream: sends outgoing lines and forwards complete remote lines
///
/// Waiting for remote data goes through `read()`, which loses nothing when
/// it is abandoned for an outgoing line. Once a byte arrives it is put back
/// and the rest of its line is read with `read_line`. Returns `Ok` when the
/// outgoing queue is closed and drained.
async fn drive_connection<S: ByteStream>(
    connection: Arc<Mutex<S>>,
    terminator: u8,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    events: mpsc::UnboundedSender<DriverEvent>,
) -> Result<()> {
    let mut stream = connection.lock().await;
    loop {
        tokio::select! {
            biased;
            line = outgoing.recv() => match line {
                Some(line) => send_line(&mut *stream, &line, terminator).await?,
                None => return Ok(()),
            },
            outcome = stream.read() => match outcome? {
                ReadOutcome::Byte(byte) => {
                    stream.put_back(byte);
                    match stream.read_line(terminator).await? {
                        LineOutcome::Line(line) if line.is_empty() => {}
                        LineOutcome::Line(line) => {
                            if events.send(DriverEvent::Remote(line)).is_err() {
                                return Ok(());
                            }
                        }
                        LineOutcome::NoData => {}
                        LineOutcome::EndOfStream => {
                            return Err(StreamError::ConnectionClosed(stream.port_name()));
                        }
                    }
                }
                // Let the input side queue lines
                ReadOutcome::NoData => tokio::task::yield_now().await,
                ReadOutcome::EndOfStream => {
                    return Err(StreamError::ConnectionClosed(stream.port_name()));
                }
            },
        }
    }
}

async fn send_line<S: ByteStream>(stream: &mut S, line: &[u8], terminator: u8) -> Result<()> {
    let expected = line.len() + 1;
    let sent = stream.write_line(line, terminator).await?;
    if sent < expected {
        return Err(StreamError::Io(io::Error::new(
            ErrorKind::TimedOut,
            format!("only {sent} of {expected} bytes sent"),
        )));
    }
    debug!(size = sent, "Tx >>");
    Ok(())
}
