//! Error types for the external collaborators.
//!
//! Neither of these ever reaches a client as a Rust error: the server's
//! dispatcher turns them into error responses, and the LLM gateway folds
//! `CompletionError` into an `{"error": ...}` payload.

use thiserror::Error;

/// Failure reported by the host (CAD application) integration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host rejected or failed to run a command.
    #[error("command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// The host application is not reachable (no open document, add-in
    /// unloaded, ...).
    #[error("host integration unavailable: {0}")]
    Unavailable(String),

    /// The host call panicked or was cancelled before returning.
    #[error("host integration aborted: {0}")]
    Aborted(String),
}

/// Failure reported by the completion service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// No service client has been configured at all.
    #[error("completion service not available")]
    Unavailable,

    /// The credential named here is not set.
    #[error("{0} not configured")]
    MissingCredential(String),

    /// Transport-level failure talking to the remote service.
    #[error("completion request failed: {0}")]
    Request(String),

    /// The remote service answered with a non-success status.
    #[error("completion service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The remote answer did not have the expected shape.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}
