// Listening socket construction
//
// tokio's TcpListener::bind neither exposes the backlog nor lets us set
// SO_REUSEADDR before bind, so the socket is assembled with socket2 and
// then handed to tokio.

use crate::{Result, StreamError};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Pending connections queued by the kernel before `accept`
pub const DEFAULT_BACKLOG: i32 = 10;

/// Creates a non-blocking listener on `addr` with address reuse enabled
///
/// Must be called from within a tokio runtime.
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(StreamError::SocketCreation)?;

    socket
        .set_reuse_address(true)
        .map_err(StreamError::SocketOption)?;
    socket
        .set_nonblocking(true)
        .map_err(StreamError::SocketOption)?;

    socket
        .bind(&addr.into())
        .map_err(|source| StreamError::Bind { addr, source })?;
    socket
        .listen(backlog)
        .map_err(|source| StreamError::Bind { addr, source })?;

    TcpListener::from_std(socket.into()).map_err(StreamError::Io)
}
