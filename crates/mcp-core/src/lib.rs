//! mcp-core
//!
//! Pure relay logic shared by the server and the client:
//! - messages (requests, responses, payloads)
//! - the host-integration collaborator and its simulated stand-in
//! - the completion-service collaborator
//! - collaborator error types

pub mod messages;
pub mod host;
pub mod completion;
pub mod error;

pub use messages::{
    CommandResult,
    Completion,
    Component,
    Message,
    ModelInfo,
    Payload,
    Request,
    Response,
    ResponseKind,
    Status,
};

pub use host::{HostIntegration, SimulatedHost};
pub use completion::CompletionService;
pub use error::{CompletionError, HostError};
