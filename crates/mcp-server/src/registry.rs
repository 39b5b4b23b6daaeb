//! Registry of live client connections.
//!
//! The registry maps each [`ClientId`] to a [`ConnectionHandle`]. The
//! handle does not own the socket (the connection worker does); it is
//! how the rest of the server reaches a connection:
//! - routing a response to the connection's writer task,
//! - asking the connection to close (server shutdown).
//!
//! Only the server's accept loop inserts entries, and only the owning
//! worker (or `Server::stop`) removes them.

use std::collections::HashMap;
use std::sync::Arc;

use mcp_core::Response;
use tokio::sync::{mpsc, Notify, RwLock};
use tracing::warn;

use crate::types::{ClientId, OutboundRx, OutboundTx};

/// Non-owning handle to one client connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    outbound: OutboundTx,
    close: Arc<Notify>,
}

/// The connection's writer is gone; the response was not queued.
#[derive(Debug)]
pub struct ConnectionClosed(pub Response);

impl ConnectionHandle {
    /// Create a handle plus the receiving end for the writer task.
    pub fn new() -> (Self, OutboundRx) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let handle = Self {
            outbound,
            close: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    /// Queue a response for the connection's writer.
    pub fn send(&self, response: Response) -> Result<(), ConnectionClosed> {
        self.outbound
            .send(response)
            .map_err(|e| ConnectionClosed(e.0))
    }

    /// Ask the connection to shut down. Safe to call more than once, and
    /// remembered if the worker is not waiting at the moment.
    pub fn close(&self) {
        self.close.notify_one();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn close_requested(&self) {
        self.close.notified().await;
    }

    /// Resolves once the writer task has stopped accepting responses.
    pub async fn writer_closed(&self) {
        self.outbound.closed().await;
    }

    pub fn is_writable(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// Shared registry of connected clients.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<RwLock<HashMap<ClientId, ConnectionHandle>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle` under `id`; a colliding entry is replaced.
    pub async fn register(&self, id: ClientId, handle: ConnectionHandle) {
        let previous = {
            let mut guard = self.inner.write().await;
            guard.insert(id, handle)
        };

        if previous.is_some() {
            warn!(client = %id, "client id collision, replacing registry entry");
        }
    }

    /// Remove `id`. Returns whether an entry was actually removed.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(&id).is_some()
    }

    /// Handle for routing a response to `id`.
    pub async fn lookup(&self, id: ClientId) -> Option<ConnectionHandle> {
        let guard = self.inner.read().await;
        guard.get(&id).cloned()
    }

    pub async fn contains(&self, id: ClientId) -> bool {
        self.inner.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remove and return every entry.
    pub async fn drain(&self) -> Vec<(ClientId, ConnectionHandle)> {
        let mut guard = self.inner.write().await;
        guard.drain().collect()
    }
}
