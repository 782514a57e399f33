use super::config::ServerConfig;
use super::handler::{HandlerEvent, handle_connection};
use super::registry::{ConnectionId, ConnectionInfo, ConnectionRegistry};
use crate::network::address::peer_name;
use crate::network::{bind_listener, resolve};
use crate::{Result, StreamError};
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, error, info, warn};

/// Requests a [`ServerHandle`] sends to the running acceptor
#[derive(Debug)]
enum ServerCommand {
    List(oneshot::Sender<Vec<ConnectionInfo>>),
    Close(ConnectionId, oneshot::Sender<bool>),
}

/// Line echo server: accepts connections and runs one handler per connection
///
/// # Examples
///
/// ```no_run
/// use tcpline::{Acceptor, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let acceptor = Acceptor::bind(ServerConfig::new("127.0.0.1", 5555)).await?;
///     println!("listening on {}", acceptor.local_addr());
///     acceptor.run().await?;
///     Ok(())
/// }
/// ```
pub struct Acceptor {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
    events_tx: mpsc::UnboundedSender<HandlerEvent>,
    events_rx: mpsc::UnboundedReceiver<HandlerEvent>,
    commands_tx: mpsc::UnboundedSender<ServerCommand>,
    commands_rx: mpsc::UnboundedReceiver<ServerCommand>,
}

impl Acceptor {
    /// Resolves the bind address and starts listening
    ///
    /// Each resolved address is tried in turn; the first one that binds wins.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let mut last_error = None;
        let mut bound = None;
        for addr in resolve(&config.host, config.port).await? {
            match bind_listener(addr, config.backlog) {
                Ok(listener) => {
                    bound = Some(listener);
                    break;
                }
                Err(e) => {
                    debug!(%addr, error = %e, "Bind attempt failed");
                    last_error = Some(e);
                }
            }
        }
        let listener = match (bound, last_error) {
            (Some(listener), _) => listener,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(StreamError::AddressResolution {
                    host: config.host.clone(),
                    port: config.port,
                    reason: "no address to bind to".to_string(),
                });
            }
        };

        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, backlog = config.backlog, "Line echo server listening");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            listener,
            local_addr,
            registry: ConnectionRegistry::new(),
            events_tx,
            events_rx,
            commands_tx,
            commands_rx,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle for inspecting and closing live connections
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            commands: self.commands_tx.clone(),
            local_addr: self.local_addr,
        }
    }

    /// Accepts connections until accepting or a handler fails
    ///
    /// There is no shutdown path: the loop only returns with the error that
    /// stopped it, leaving the decision to exit to the caller.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_handler(stream, peer),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            return Err(StreamError::Io(e));
                        }
                    }
                }
                Some(event) = self.events_rx.recv() => self.on_handler_event(event)?,
                Some(command) = self.commands_rx.recv() => self.on_command(command),
            }
        }
    }

    fn spawn_handler(&mut self, stream: TcpStream, peer: SocketAddr) {
        let id = self.registry.allocate_id();
        let span = tracing::info_span!("connection", %id, peer = %peer_name(&peer));
        let task = tokio::spawn(
            handle_connection(id, stream, self.config.clone(), self.events_tx.clone())
                .instrument(span),
        );
        self.registry.insert(id, peer, task);
        info!(%id, peer = %peer_name(&peer), live = self.registry.len(), "Accepted connection");
    }

    fn on_handler_event(&mut self, event: HandlerEvent) -> Result<()> {
        match event {
            HandlerEvent::Closed(id) => {
                match self.registry.remove(id) {
                    Some(peer) => {
                        info!(%id, peer = %peer_name(&peer), live = self.registry.len(), "Connection closed");
                    }
                    None => debug!(%id, "Closed connection was already removed"),
                }
                Ok(())
            }
            HandlerEvent::Failed(id, e) => {
                self.registry.remove(id);
                error!(%id, error = %e, "Connection handler failed");
                Err(e)
            }
        }
    }

    fn on_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::List(reply) => {
                let _ = reply.send(self.registry.list());
            }
            ServerCommand::Close(id, reply) => {
                let closed = self.registry.close(id);
                if closed {
                    info!(%id, live = self.registry.len(), "Connection closed on request");
                } else {
                    warn!(%id, "Close requested for unknown connection");
                }
                let _ = reply.send(closed);
            }
        }
    }
}

/// Cloneable handle to a running [`Acceptor`]
#[derive(Debug, Clone)]
pub struct ServerHandle {
    commands: mpsc::UnboundedSender<ServerCommand>,
    local_addr: SocketAddr,
}

impl ServerHandle {
    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Live connections, ordered by identity
    pub async fn connections(&self) -> Result<Vec<ConnectionInfo>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(ServerCommand::List(reply_tx))?;
        reply_rx.await.map_err(|_| server_gone())
    }

    /// Closes one connection; returns false if it was not live
    pub async fn close(&self, id: ConnectionId) -> Result<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(ServerCommand::Close(id, reply_tx))?;
        reply_rx.await.map_err(|_| server_gone())
    }

    fn send(&self, command: ServerCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| server_gone())
    }
}

fn server_gone() -> StreamError {
    StreamError::Io(io::Error::new(ErrorKind::NotConnected, "server is no longer running"))
}
