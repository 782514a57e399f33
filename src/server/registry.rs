use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Identity of one accepted connection, unique for the server's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of a live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer: SocketAddr,
}

#[derive(Debug)]
struct Entry {
    peer: SocketAddr,
    task: JoinHandle<()>,
}

/// Live connections and their handler tasks
///
/// Owned by the acceptor alone. An entry is removed exactly once, either
/// through [`remove`](Self::remove) when its handler reports that it ended,
/// or through [`close`](Self::close) on an explicit request.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    next_id: u64,
    entries: HashMap<ConnectionId, Entry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the identity for the next accepted connection
    pub fn allocate_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId(self.next_id)
    }

    pub fn insert(&mut self, id: ConnectionId, peer: SocketAddr, task: JoinHandle<()>) {
        self.entries.insert(id, Entry { peer, task });
    }

    /// Forgets a connection whose handler has finished
    ///
    /// Returns the peer address, or `None` if the entry was already gone.
    pub fn remove(&mut self, id: ConnectionId) -> Option<SocketAddr> {
        self.entries.remove(&id).map(|entry| entry.peer)
    }

    /// Stops a connection's handler and forgets it
    ///
    /// Aborting the handler drops its socket, which closes the connection.
    pub fn close(&mut self, id: ConnectionId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                entry.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live connections ordered by identity
    pub fn list(&self) -> Vec<ConnectionInfo> {
        let mut live: Vec<ConnectionInfo> = self
            .entries
            .iter()
            .map(|(id, entry)| ConnectionInfo {
                id: *id,
                peer: entry.peer,
            })
            .collect();
        live.sort_by_key(|info| info.id);
        live
    }
}
