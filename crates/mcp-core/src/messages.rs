//! Message types exchanged between clients and the relay server.
//!
//! These are **transport-agnostic** logical messages:
//! - [`Request`]: what a client asks for.
//! - [`Response`]: what the server sends back.
//!
//! Wire concerns (JSON decoding of raw bytes, line framing, field
//! defaults) live in the `mcp-protocol` crate; this module only fixes the
//! shape of each message and how a response serializes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw decoded message envelope: a JSON object keyed by field name.
pub type Message = Map<String, Value>;

/// A typed client request.
///
/// The `type` tag of the envelope selects the variant. Unrecognized tags
/// are kept as [`Request::Unknown`] so the server can report them back.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Run a command in the host application.
    ///
    /// `command` is `None` when the client omitted it; that is passed on to
    /// the host rather than rejected.
    FusionCommand {
        command: Option<String>,
        params: Value,
    },

    /// Ask the host for a description of the open model.
    GetModelInfo,

    /// Forward a prompt to the completion service.
    ///
    /// `model` is `None` when the client did not pick one; the server
    /// substitutes its configured default.
    LlmRequest {
        prompt: String,
        model: Option<String>,
    },

    /// Any other `type` value, rendered as text.
    Unknown(String),
}

/// Outcome flag carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The `type` tag of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    CommandResult,
    ModelInfo,
    LlmResult,
}

impl ResponseKind {
    /// The tag as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::CommandResult => "command_result",
            ResponseKind::ModelInfo => "model_info",
            ResponseKind::LlmResult => "llm_result",
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing a host command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: Option<String>,
    pub executed: bool,
    pub message: String,
}

/// One component of the open model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
}

/// Description of the model currently open in the host.
///
/// `components` keeps the host's order; callers rely on it being stable
/// across repeated queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub components: Vec<Component>,
}

/// What the completion gateway hands back: either text or an error string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Completion {
    Response { response: String },
    Error { error: String },
}

impl Completion {
    pub fn response(text: impl Into<String>) -> Self {
        Completion::Response {
            response: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Completion::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Completion::Error { .. })
    }
}

/// Payload fields of a response, flattened next to `status` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// `command` + `result` of a `fusion_command`.
    Command {
        command: Option<String>,
        result: CommandResult,
    },

    /// `data` of a `get_model_info`.
    ModelInfo { data: ModelInfo },

    /// `data` of an `llm_request`.
    Completion { data: Completion },

    /// Human-readable `message`, used by error responses.
    Message { message: String },
}

/// A server → client response envelope.
///
/// Serializes with `status` first, then `type` (omitted when absent), then
/// the payload fields, e.g.
/// `{"status":"success","type":"model_info","data":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: Status,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResponseKind>,

    #[serde(flatten)]
    pub payload: Payload,
}

// -----------------------------------------------------------------------------
// Convenience constructors
// -----------------------------------------------------------------------------

impl Response {
    /// Successful `command_result` echoing the requested command.
    pub fn command_result(command: Option<String>, result: CommandResult) -> Self {
        Response {
            status: Status::Success,
            kind: Some(ResponseKind::CommandResult),
            payload: Payload::Command { command, result },
        }
    }

    /// Successful `model_info`.
    pub fn model_info(data: ModelInfo) -> Self {
        Response {
            status: Status::Success,
            kind: Some(ResponseKind::ModelInfo),
            payload: Payload::ModelInfo { data },
        }
    }

    /// `llm_result`; the status follows whether the completion failed.
    pub fn llm_result(data: Completion) -> Self {
        let status = if data.is_error() {
            Status::Error
        } else {
            Status::Success
        };

        Response {
            status,
            kind: Some(ResponseKind::LlmResult),
            payload: Payload::Completion { data },
        }
    }

    /// Untyped protocol error (missing or unknown `type`).
    pub fn error(message: impl Into<String>) -> Self {
        Response {
            status: Status::Error,
            kind: None,
            payload: Payload::Message {
                message: message.into(),
            },
        }
    }

    /// A handler for `kind` failed.
    pub fn handler_error(kind: ResponseKind, message: impl Into<String>) -> Self {
        Response {
            status: Status::Error,
            kind: Some(kind),
            payload: Payload::Message {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example_model() -> ModelInfo {
        ModelInfo {
            name: "Example Model".to_string(),
            version: "1.0".to_string(),
            components: vec![
                Component {
                    id: "comp1".to_string(),
                    name: "Component 1".to_string(),
                },
                Component {
                    id: "comp2".to_string(),
                    name: "Component 2".to_string(),
                },
            ],
        }
    }

    #[test]
    fn model_info_response_serializes_in_wire_order() {
        let text = serde_json::to_string(&Response::model_info(example_model())).unwrap();
        assert_eq!(
            text,
            r#"{"status":"success","type":"model_info","data":{"name":"Example Model","version":"1.0","components":[{"id":"comp1","name":"Component 1"},{"id":"comp2","name":"Component 2"}]}}"#
        );
    }

    #[test]
    fn command_result_keeps_null_command() {
        let result = CommandResult {
            command: None,
            executed: true,
            message: "ok".to_string(),
        };
        let value = serde_json::to_value(Response::command_result(None, result)).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "type": "command_result",
                "command": null,
                "result": {"command": null, "executed": true, "message": "ok"}
            })
        );
    }

    #[test]
    fn protocol_error_has_no_type() {
        let value = serde_json::to_value(Response::error("Missing message type")).unwrap();
        assert_eq!(value, json!({"status": "error", "message": "Missing message type"}));
    }

    #[test]
    fn llm_result_status_follows_completion() {
        let ok = Response::llm_result(Completion::response("hi"));
        assert!(ok.is_success());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "success", "type": "llm_result", "data": {"response": "hi"}})
        );

        let failed = Response::llm_result(Completion::error("OPENAI_API_KEY not configured"));
        assert!(!failed.is_success());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "status": "error",
                "type": "llm_result",
                "data": {"error": "OPENAI_API_KEY not configured"}
            })
        );
    }

    #[test]
    fn completion_deserializes_either_shape() {
        let ok: Completion = serde_json::from_value(json!({"response": "text"})).unwrap();
        assert_eq!(ok, Completion::response("text"));

        let err: Completion = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert!(err.is_error());
    }

    #[test]
    fn response_kind_tags() {
        assert_eq!(ResponseKind::CommandResult.as_str(), "command_result");
        assert_eq!(
            serde_json::to_value(ResponseKind::LlmResult).unwrap(),
            json!("llm_result")
        );
    }
}
