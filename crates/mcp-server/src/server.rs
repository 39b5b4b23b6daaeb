//! TCP listener and server lifecycle.
//!
//! This module:
//! - binds and listens on the configured address/port,
//! - accepts new TCP connections,
//! - assigns each connection a `ClientId` and registers it,
//! - spawns a per-client worker task to handle its I/O,
//! - tears everything down on `stop`.
//!
//! The per-client logic lives in the `client` module.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::{self, ClientContext};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::executor::CommandExecutor;
use crate::llm::LlmGateway;
use crate::registry::{ClientRegistry, ConnectionHandle};
use crate::types::ClientId;

/// Pause after a failed `accept` so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Capacity and framing limits applied to every connection.
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_clients: usize,
    backlog: u32,
    max_frame_len: usize,
}

/// State shared between the server handle and its accept loop.
#[derive(Clone)]
struct Shared {
    dispatcher: Arc<Dispatcher>,
    registry: ClientRegistry,
    next_client: Arc<AtomicU64>,
    limits: Limits,
}

/// A bound listener and the task accepting on it.
struct Listening {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// The relay server.
///
/// Created stopped. [`start`](Server::start) binds and begins accepting;
/// [`stop`](Server::stop) closes the listener and every open connection.
/// Both are idempotent.
pub struct Server {
    shared: Shared,
    running: AtomicBool,
    listening: Mutex<Option<Listening>>,
}

impl Server {
    pub fn new(config: &Config, dispatcher: Dispatcher) -> Self {
        Self {
            shared: Shared {
                dispatcher: Arc::new(dispatcher),
                registry: ClientRegistry::new(),
                next_client: Arc::new(AtomicU64::new(1)),
                limits: Limits {
                    max_clients: config.max_clients,
                    backlog: config.backlog,
                    max_frame_len: config.max_frame_len,
                },
            },
            running: AtomicBool::new(false),
            listening: Mutex::new(None),
        }
    }

    /// Server with the simulated host and the configured completion service.
    pub fn from_config(config: &Config) -> Self {
        let dispatcher = Dispatcher::new(
            CommandExecutor::simulated(),
            LlmGateway::from_config(&config.llm),
        )
        .with_default_model(config.llm.default_model.clone());

        Self::new(config, dispatcher)
    }

    /// Bind `host:port` and start accepting connections.
    ///
    /// Returns the bound address (useful with port `0`). If the server is
    /// already running this does nothing and returns the current address.
    /// On failure the server stays stopped.
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr, ServerError> {
        let mut listening = self.listening.lock().await;
        if let Some(current) = listening.as_ref() {
            warn!(addr = %current.local_addr, "server already running");
            return Ok(current.local_addr);
        }

        let listener = bind_listener(host, port, self.shared.limits.backlog).await?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(listener, self.shared.clone(), shutdown_rx));

        *listening = Some(Listening {
            local_addr,
            shutdown,
            accept_task,
        });
        self.running.store(true, Ordering::SeqCst);

        info!(addr = %local_addr, "MCP server started");
        Ok(local_addr)
    }

    /// Stop accepting, close every registered connection and clear the
    /// registry. A no-op when not running.
    pub async fn stop(&self) {
        let Some(listening) = self.listening.lock().await.take() else {
            return;
        };
        self.running.store(false, Ordering::SeqCst);

        // Stop the accept loop first so nothing registers behind our back.
        let _ = listening.shutdown.send(true);
        if let Err(e) = listening.accept_task.await {
            error!(error = %e, "accept loop ended abnormally");
        }

        let connections = self.shared.registry.drain().await;
        let count = connections.len();
        for (client_id, handle) in connections {
            debug!(client = %client_id, "closing connection");
            handle.close();
        }

        info!(closed = count, "MCP server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.lock().await.as_ref().map(|l| l.local_addr)
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.shared.registry
    }
}

/// Run a server with the given configuration until Ctrl+C.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let server = Server::from_config(&config);
    server.start(&config.bind_addr, config.port).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown requested");

    server.stop().await;
    Ok(())
}

async fn bind_listener(host: &str, port: u16, backlog: u32) -> Result<TcpListener, ServerError> {
    let display = format!("{host}:{port}");

    let addr = lookup_host((host, port))
        .await
        .map_err(|source| ServerError::Resolve {
            addr: display.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| ServerError::NoAddress(display.clone()))?;

    let bind_err = |source| ServerError::Bind {
        addr: display.clone(),
        source,
    };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_err)?;

    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(backlog).map_err(bind_err)
}

async fn accept_loop(listener: TcpListener, shared: Shared, mut shutdown: watch::Receiver<bool>) {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "error accepting connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        let current_clients = shared.registry.len().await;
        if current_clients >= shared.limits.max_clients {
            warn!(
                peer = %peer_addr,
                max_clients = shared.limits.max_clients,
                "rejecting connection: max_clients reached"
            );
            // Just drop the stream; the client sees the connection closed.
            continue;
        }

        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer_addr, error = %e, "could not set TCP_NODELAY");
        }

        let client_id = ClientId {
            seq: shared.next_client.fetch_add(1, Ordering::Relaxed),
            peer: peer_addr,
        };
        info!(client = %client_id, "new connection");

        let (handle, out_rx) = ConnectionHandle::new();
        shared.registry.register(client_id, handle.clone()).await;

        let ctx = ClientContext {
            registry: shared.registry.clone(),
            dispatcher: Arc::clone(&shared.dispatcher),
            max_frame_len: shared.limits.max_frame_len,
        };

        tokio::spawn(client::run_client(client_id, stream, handle, out_rx, ctx));
    }

    // Dropping the listener here closes the listening socket.
    debug!("accept loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            port: 0,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn stop_before_start_is_noop() {
        let server = Server::from_config(&test_config());
        server.stop().await;
        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn start_twice_returns_same_address() {
        let server = Server::from_config(&test_config());
        let first = server.start("127.0.0.1", 0).await.unwrap();
        let second = server.start("127.0.0.1", 0).await.unwrap();
        assert_eq!(first, second);
        assert!(server.is_running());

        server.stop().await;
        assert!(!server.is_running());
        assert_eq!(server.local_addr().await, None);
    }

    #[tokio::test]
    async fn can_restart_after_stop() {
        let server = Server::from_config(&test_config());
        server.start("127.0.0.1", 0).await.unwrap();
        server.stop().await;

        server.start("127.0.0.1", 0).await.unwrap();
        assert!(server.is_running());
        server.stop().await;
    }

    #[tokio::test]
    async fn bind_failure_leaves_server_stopped() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let server = Server::from_config(&test_config());
        let err = server.start("127.0.0.1", port).await.unwrap_err();

        assert!(matches!(err, ServerError::Bind { .. }));
        assert!(!server.is_running());
        assert_eq!(server.local_addr().await, None);
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_startup_error() {
        let server = Server::from_config(&test_config());
        let err = server.start("no such host.invalid", 0).await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::Resolve { .. } | ServerError::NoAddress(_)
        ));
        assert!(!server.is_running());
    }
}
