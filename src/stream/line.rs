use super::protocol::{ByteStream, ReadOutcome};
use crate::Result;
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};

/// Outcome of reading one line from a [`LineStream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A complete line, terminator removed
    Line(Vec<u8>),
    /// No complete line arrived within one read timeout
    NoData,
    /// The stream ended with nothing left to return
    EndOfStream,
}

/// Line framing over any [`ByteStream`]
///
/// Lines end with a single terminator byte. A line that is only partly
/// received when the transport reports `NoData` is pushed back onto the
/// stream, so the next call starts over with every byte still in place.
#[async_trait]
pub trait LineStream: ByteStream {
    /// Reads one terminator-delimited line
    async fn read_line(&mut self, terminator: u8) -> Result<LineOutcome> {
        let mut line = BytesMut::new();
        loop {
            match self.read().await {
                Ok(ReadOutcome::Byte(byte)) if byte == terminator => {
                    return Ok(LineOutcome::Line(line.to_vec()));
                }
                Ok(ReadOutcome::Byte(byte)) => line.put_u8(byte),
                Ok(ReadOutcome::NoData) => {
                    self.unread(&line);
                    return Ok(LineOutcome::NoData);
                }
                Ok(ReadOutcome::EndOfStream) if line.is_empty() => {
                    return Ok(LineOutcome::EndOfStream);
                }
                // Unterminated tail of a finished stream
                Ok(ReadOutcome::EndOfStream) => return Ok(LineOutcome::Line(line.to_vec())),
                Err(e) => {
                    self.unread(&line);
                    return Err(e);
                }
            }
        }
    }

    /// Writes `line` followed by `terminator`, returning the bytes sent
    async fn write_line(&mut self, line: &[u8], terminator: u8) -> Result<usize> {
        let mut framed = BytesMut::with_capacity(line.len() + 1);
        framed.put_slice(line);
        framed.put_u8(terminator);
        self.write(&framed).await
    }

    /// Restores `bytes` to the front of the stream in their original order
    fn unread(&mut self, bytes: &[u8]) {
        for &byte in bytes.iter().rev() {
            self.put_back(byte);
        }
    }
}

impl<S: ByteStream + ?Sized> LineStream for S {}
