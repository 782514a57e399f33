use super::protocol::{ByteStream, ReadOutcome};
use crate::{Result, StreamError};
use async_trait::async_trait;
use std::collections::VecDeque;

/// In-process [`ByteStream`] backed by byte queues
///
/// Bytes handed to [`feed`](Self::feed) are what `read` returns; bytes passed
/// to `write` are captured and exposed through [`written`](Self::written).
/// Reading an empty queue yields `NoData` immediately, and `EndOfStream`
/// once [`finish`](Self::finish) has been called.
#[derive(Debug, Default)]
pub struct MemoryStream {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    finished: bool,
    open: bool,
}

impl MemoryStream {
    /// Creates an open, empty stream
    pub fn new() -> Self {
        Self {
            open: true,
            ..Default::default()
        }
    }

    /// Appends bytes to be read
    pub fn feed(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }

    /// Marks the input as complete
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

#[async_trait]
impl ByteStream for MemoryStream {
    async fn read(&mut self) -> Result<ReadOutcome> {
        if let Some(byte) = self.incoming.pop_front() {
            return Ok(ReadOutcome::Byte(byte));
        }
        if self.finished || !self.open {
            Ok(ReadOutcome::EndOfStream)
        } else {
            Ok(ReadOutcome::NoData)
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(StreamError::Configuration(
                "Cannot write on a closed memory stream".to_string(),
            ));
        }
        self.written.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn put_back(&mut self, byte: u8) {
        self.incoming.push_front(byte);
    }

    async fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn port_name(&self) -> String {
        "[memory]".to_string()
    }
}
