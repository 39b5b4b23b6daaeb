//! mcp-server
//!
//! Multi-client async TCP relay: accepts client connections, decodes
//! newline-delimited JSON requests, dispatches them to the host
//! integration or the completion service, and answers on the same
//! connection.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod llm;
pub mod openai;
pub mod registry;
pub mod server;
pub mod types;

// internal: the per-connection worker, driven by `server`
mod client;

pub use config::{Config, LlmConfig};
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, ServerError};
pub use executor::CommandExecutor;
pub use llm::LlmGateway;
pub use registry::{ClientRegistry, ConnectionHandle};
pub use server::Server;
pub use types::ClientId;
