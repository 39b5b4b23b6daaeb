//! mcp-client
//!
//! Client side of the relay: connect to a server, send requests, and
//! react to responses either through per-kind handlers or by awaiting
//! them in order.

pub mod connection;
pub mod error;

pub use connection::{McpClient, ResponseHandler};
pub use error::ClientError;
