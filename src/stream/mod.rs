//! Transport-agnostic byte stream capability
//!
//! This module defines the [`ByteStream`] trait implemented by every
//! transport (TCP, in-memory), the tagged [`ReadOutcome`] returned by
//! single-byte reads, and the line layer built on top of them.

pub mod line;
pub mod memory;
pub mod protocol;

pub use line::{LineOutcome, LineStream};
pub use memory::MemoryStream;
pub use protocol::{ByteStream, ReadOutcome};
