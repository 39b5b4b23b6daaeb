// crates/mcp-client/src/connection.rs

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use dashmap::DashMap;
use mcp_protocol::wire_types::{
    WireRequestType, DEFAULT_MAX_FRAME_LEN, FIELD_COMMAND, FIELD_MODEL, FIELD_PARAMS,
    FIELD_PROMPT, FIELD_TYPE, READ_CHUNK_SIZE,
};
use mcp_protocol::{encode_frame, encode_message, next_frame};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ClientError;

/// Callback for one response kind (`"command_result"`, `"model_info"`, ...).
pub type ResponseHandler = Arc<dyn Fn(&Value) + Send + Sync>;

type HandlerMap = Arc<DashMap<String, ResponseHandler>>;

/// A connection to an MCP relay server.
///
/// Responses are delivered in one of two ways:
/// - if a handler is registered for the response's `type`, that handler
///   is called once with it;
/// - otherwise the response is queued for [`next_response`](Self::next_response).
pub struct McpClient {
    server_addr: String,
    writer: Option<OwnedWriteHalf>,
    write_buffer: BytesMut,
    handlers: HandlerMap,
    responses: UnboundedReceiver<Value>,
    connected: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl McpClient {
    pub async fn connect<A>(addr: A) -> Result<Self, ClientError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let server_addr = addr.to_string();
        info!("Connecting to {}...", server_addr);

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: server_addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let handlers: HandlerMap = Arc::new(DashMap::new());
        let connected = Arc::new(AtomicBool::new(true));
        let (tx, responses) = mpsc::unbounded_channel();

        let reader = tokio::spawn(receive_loop(
            read_half,
            Arc::clone(&handlers),
            tx,
            Arc::clone(&connected),
        ));

        info!("Connected to MCP server at {}", server_addr);
        Ok(Self {
            server_addr,
            writer: Some(write_half),
            write_buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            handlers,
            responses,
            connected,
            reader: Some(reader),
        })
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Register `handler` for responses whose `type` is `kind`, replacing
    /// any previous handler for that kind.
    pub fn register_handler<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let kind = kind.into();
        info!("Registered handler for {} responses", kind);
        self.handlers.insert(kind, Arc::new(handler));
    }

    pub fn unregister_handler(&self, kind: &str) -> bool {
        self.handlers.remove(kind).is_some()
    }

    /// Send one request envelope.
    pub async fn send_message(&mut self, message: &Value) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let writer = self.writer.as_mut().ok_or(ClientError::NotConnected)?;

        let payload = encode_message(message)?;
        self.write_buffer.clear();
        encode_frame(&payload, &mut self.write_buffer);

        if let Err(e) = writer.write_all(&self.write_buffer).await {
            error!("Error sending message: {}", e);
            self.connected.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        debug!("Sent message: {}", message);
        Ok(())
    }

    /// Ask the host to run `command`.
    pub async fn execute_fusion_command(
        &mut self,
        command: &str,
        params: Map<String, Value>,
    ) -> Result<(), ClientError> {
        let message = json!({
            FIELD_TYPE: WireRequestType::FusionCommand.as_tag(),
            FIELD_COMMAND: command,
            FIELD_PARAMS: params,
        });
        self.send_message(&message).await
    }

    pub async fn get_model_info(&mut self) -> Result<(), ClientError> {
        let message = json!({ FIELD_TYPE: WireRequestType::GetModelInfo.as_tag() });
        self.send_message(&message).await
    }

    /// Forward `prompt` to the server's completion service. Without a
    /// `model` the server picks its default.
    pub async fn llm_request(&mut self, prompt: &str, model: Option<&str>) -> Result<(), ClientError> {
        let mut message = json!({
            FIELD_TYPE: WireRequestType::LlmRequest.as_tag(),
            FIELD_PROMPT: prompt,
        });
        if let (Some(model), Some(obj)) = (model, message.as_object_mut()) {
            obj.insert(FIELD_MODEL.to_string(), Value::String(model.to_string()));
        }
        self.send_message(&message).await
    }

    /// Next response not claimed by a handler, in arrival order.
    ///
    /// Returns `None` once the connection is closed and the queue is empty.
    pub async fn next_response(&mut self) -> Option<Value> {
        self.responses.recv().await
    }

    /// Send `message` and wait for the next unclaimed response.
    pub async fn request(&mut self, message: &Value) -> Result<Value, ClientError> {
        self.send_message(message).await?;
        self.next_response().await.ok_or(ClientError::NotConnected)
    }

    /// Close the connection. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        info!("Disconnected from MCP server");
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

async fn receive_loop(
    mut read_half: OwnedReadHalf,
    handlers: HandlerMap,
    tx: UnboundedSender<Value>,
    connected: Arc<AtomicBool>,
) {
    let mut read_buffer = BytesMut::with_capacity(READ_CHUNK_SIZE);
    let mut buf = [0u8; READ_CHUNK_SIZE];

    'read: loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                warn!("Connection to MCP server closed");
                break;
            }
            Ok(n) => read_buffer.extend_from_slice(&buf[..n]),
            Err(e) => {
                error!("Error receiving message: {}", e);
                break;
            }
        }

        loop {
            match next_frame(&mut read_buffer, DEFAULT_MAX_FRAME_LEN) {
                Ok(Some(frame)) => match serde_json::from_slice::<Value>(&frame) {
                    Ok(response) => deliver(response, &handlers, &tx),
                    Err(e) => {
                        error!("Undecodable response from server: {}", e);
                        break 'read;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Bad frame from server: {}", e);
                    break 'read;
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
}

fn deliver(response: Value, handlers: &HandlerMap, tx: &UnboundedSender<Value>) {
    let kind = response.get(FIELD_TYPE).and_then(Value::as_str);

    // Clone the handler out so the map is not locked while it runs.
    let handler = kind.and_then(|k| handlers.get(k).map(|h| Arc::clone(h.value())));

    if let (Some(kind), Some(handler)) = (kind, handler) {
        info!("Received {} response", kind);
        if catch_unwind(AssertUnwindSafe(|| handler(&response))).is_err() {
            error!("Error in response handler for {}", kind);
        }
        return;
    }

    if kind.is_none() {
        warn!("Received response without type: {}", response);
    }
    let _ = tx.send(response);
}
