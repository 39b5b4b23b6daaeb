//! Per-connection worker.
//!
//! Each accepted connection gets one worker running
//! `Reading → Processing → Responding → Reading` until it reaches
//! `Closed`:
//!
//! - the reader half accumulates bytes and cuts them into frames,
//! - each frame is decoded and dispatched, one request at a time,
//! - the response is routed through the registry to this connection's
//!   writer task, which preserves request order.
//!
//! End of stream, a read error, an undecodable frame, a dead writer or a
//! close request from the server all end the worker. On the way out it
//! unregisters its id exactly once and lets the writer drain.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures::FutureExt;
use mcp_core::{Message, Response};
use mcp_protocol::wire_types::READ_CHUNK_SIZE;
use mcp_protocol::{decode_message, encode_frame, encode_response, next_frame, DecodeError, FrameError};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::registry::{ClientRegistry, ConnectionHandle};
use crate::types::{ClientId, OutboundRx};

/// How long a closing worker waits for queued responses to be written.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const HANDLER_PANICKED: &str = "Internal error while handling message";

const ENCODE_FAILED: &[u8] = br#"{"status":"error","message":"Failed to encode response"}"#;

/// Why a connection reached `Closed`.
#[derive(Debug, Error)]
enum CloseReason {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("undecodable message: {0}")]
    Decode(#[from] DecodeError),

    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("connection no longer writable")]
    WriterGone,

    #[error("server shutting down")]
    Shutdown,
}

/// Everything a worker needs besides its socket.
pub(crate) struct ClientContext {
    pub registry: ClientRegistry,
    pub dispatcher: Arc<Dispatcher>,
    pub max_frame_len: usize,
}

/// Run the worker for a single, already registered connection.
pub(crate) async fn run_client(
    client_id: ClientId,
    stream: TcpStream,
    handle: ConnectionHandle,
    out_rx: OutboundRx,
    ctx: ClientContext,
) {
    let (read_half, write_half) = stream.into_split();

    let mut writer = tokio::spawn(write_responses(client_id, write_half, out_rx));

    let reason = read_requests(client_id, read_half, &handle, &ctx).await;

    // Closed: drop every sender we hold so the writer can finish.
    let removed = ctx.registry.unregister(client_id).await;
    drop(handle);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        warn!(client = %client_id, "writer did not drain in time, aborting");
        writer.abort();
    }

    match reason {
        CloseReason::PeerClosed | CloseReason::Shutdown => {
            info!(client = %client_id, reason = %reason, unregistered = removed, "client disconnected");
        }
        _ => {
            warn!(client = %client_id, reason = %reason, unregistered = removed, "client dropped");
        }
    }
}

async fn read_requests(
    client_id: ClientId,
    mut read_half: OwnedReadHalf,
    handle: &ConnectionHandle,
    ctx: &ClientContext,
) -> CloseReason {
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        // Process every complete frame already buffered.
        loop {
            let frame = match next_frame(&mut buffer, ctx.max_frame_len) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return e.into(),
            };

            let message = match decode_message(&frame) {
                Ok(message) => message,
                Err(e) => return e.into(),
            };

            let response = tokio::select! {
                biased;
                _ = handle.close_requested() => return CloseReason::Shutdown,
                response = dispatch_guarded(client_id, &message, ctx) => response,
            };

            if let Err(reason) = route_response(client_id, response, &ctx.registry).await {
                return reason;
            }
        }

        let n = tokio::select! {
            biased;
            _ = handle.close_requested() => return CloseReason::Shutdown,
            _ = handle.writer_closed() => return CloseReason::WriterGone,
            read = read_half.read(&mut chunk) => match read {
                Ok(0) => {
                    if !buffer.is_empty() {
                        debug!(client = %client_id, pending = buffer.len(), "discarding unterminated frame");
                    }
                    return CloseReason::PeerClosed;
                }
                Ok(n) => n,
                Err(e) => return e.into(),
            },
        };

        buffer.extend_from_slice(&chunk[..n]);
    }
}

/// Dispatch one message; a panicking handler still yields a response.
async fn dispatch_guarded(client_id: ClientId, message: &Message, ctx: &ClientContext) -> Response {
    match AssertUnwindSafe(ctx.dispatcher.dispatch(client_id, message))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(_panic) => {
            error!(client = %client_id, "request handler panicked");
            Response::error(HANDLER_PANICKED)
        }
    }
}

/// Hand `response` to the writer registered for `client_id`.
async fn route_response(
    client_id: ClientId,
    response: Response,
    registry: &ClientRegistry,
) -> Result<(), CloseReason> {
    match registry.lookup(client_id).await {
        Some(conn) => conn.send(response).map_err(|_| CloseReason::WriterGone),
        None => {
            // Only happens while the server is stopping.
            warn!(client = %client_id, "response for unregistered client dropped");
            Ok(())
        }
    }
}

/// Encoded response, or a fixed error envelope if encoding failed so the
/// request still gets exactly one reply.
fn payload_or_fallback(client_id: ClientId, encoded: Result<Vec<u8>, serde_json::Error>) -> Vec<u8> {
    encoded.unwrap_or_else(|e| {
        error!(client = %client_id, error = %e, "failed to encode response");
        ENCODE_FAILED.to_vec()
    })
}

/// Writer task: encode queued responses and write them in order.
async fn write_responses(client_id: ClientId, mut write_half: OwnedWriteHalf, mut out_rx: OutboundRx) {
    let mut out = BytesMut::with_capacity(READ_CHUNK_SIZE);

    while let Some(response) = out_rx.recv().await {
        let payload = payload_or_fallback(client_id, encode_response(&response));

        out.clear();
        encode_frame(&payload, &mut out);

        if let Err(e) = write_half.write_all(&out).await {
            warn!(client = %client_id, error = %e, "write error");
            break;
        }
        if let Err(e) = write_half.flush().await {
            warn!(client = %client_id, error = %e, "flush error");
            break;
        }

        debug!(client = %client_id, bytes = out.len(), "sent response");
    }

    // Let the reader see the writer is gone before we shut the socket.
    drop(out_rx);
    let _ = write_half.shutdown().await;
}
