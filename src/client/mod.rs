//! Interactive line client
//!
//! [`Driver`] joins local input and a remote [`ByteStream`](crate::ByteStream):
//! lines typed locally go to the remote end, lines arriving from it are
//! printed with an `Rx <<` marker.

pub mod driver;

pub use driver::Driver;
