//! Addressing, interface discovery and listener construction

pub mod address;
pub mod interfaces;
pub mod socket_builder;

pub use address::{looks_like_ip, resolve};
pub use interfaces::{default_host, local_addresses, Interface};
pub use socket_builder::{bind_listener, DEFAULT_BACKLOG};
