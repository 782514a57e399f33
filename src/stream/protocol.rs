use crate::Result;
use async_trait::async_trait;

/// Outcome of reading a single byte from a [`ByteStream`]
///
/// A timeout with nothing to read and a literal `0x00` byte are distinct
/// values, so callers never have to guess which one a sentinel meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The next byte of the stream
    Byte(u8),
    /// Nothing arrived within the read timeout
    NoData,
    /// The stream is closed and every buffered byte has been consumed
    EndOfStream,
}

impl ReadOutcome {
    /// Returns the byte if this outcome carries one
    pub fn byte(self) -> Option<u8> {
        match self {
            ReadOutcome::Byte(byte) => Some(byte),
            _ => None,
        }
    }
}

/// Byte-level transport capability
///
/// Every transport honors the same semantics so that line parsing layered
/// on top (see [`LineStream`](super::LineStream)) works unchanged on any
/// of them.
///
/// # Examples
///
/// ```
/// use tcpline::{ByteStream, MemoryStream, ReadOutcome};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut stream = MemoryStream::new();
///     stream.feed(b"ab");
///
///     stream.put_back(b'z');
///     assert_eq!(stream.read().await?, ReadOutcome::Byte(b'z'));
///     assert_eq!(stream.read().await?, ReadOutcome::Byte(b'a'));
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ByteStream: Send {
    /// Reads the next byte, serving put-back and buffered bytes first
    async fn read(&mut self) -> Result<ReadOutcome>;

    /// Writes `bytes`, returning how many were actually sent
    ///
    /// The count may be lower than `bytes.len()` when the transport's write
    /// budget runs out; callers must check it.
    async fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Pushes `byte` to the front so the next [`read`](Self::read) returns it
    fn put_back(&mut self, byte: u8);

    /// Opens the underlying transport; a no-op when already open
    async fn open(&mut self) -> Result<()>;

    /// Closes the underlying transport; a no-op when already closed
    fn close(&mut self);

    /// Flushes pending output
    async fn flush(&mut self) -> Result<()>;

    /// Returns true while the transport is open
    fn is_open(&self) -> bool;

    /// Human readable name of the remote end, e.g. `[127.0.0.1:5555]`
    fn port_name(&self) -> String;
}
