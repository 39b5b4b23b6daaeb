//! Shared types for the relay server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for connected clients
//! - channel aliases between a connection worker and its writer task

use std::fmt;
use std::net::SocketAddr;

use mcp_core::Response;
use tokio::sync::mpsc;

/// Identifier for a connected client.
///
/// `seq` is unique over the lifetime of the server that assigned it, so
/// two connections from the same peer address never collide. `peer` is
/// kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId {
    pub seq: u64,
    pub peer: SocketAddr,
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.peer, self.seq)
    }
}

/// Responses queued for one client's writer task.
pub type OutboundTx = mpsc::UnboundedSender<Response>;
pub type OutboundRx = mpsc::UnboundedReceiver<Response>;
