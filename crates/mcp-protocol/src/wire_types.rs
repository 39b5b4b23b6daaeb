//! Wire constants: message tags, field names and size limits.
//!
//! The JSON encode/decode logic lives in `json_codec`; the byte-stream
//! framing lives in `framing`.

/// Request `type` tags (client → server).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireRequestType {
    /// Execute a command in the host application.
    FusionCommand,

    /// Describe the open model.
    GetModelInfo,

    /// Forward a prompt to the completion service.
    LlmRequest,
}

impl WireRequestType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fusion_command" => Some(WireRequestType::FusionCommand),
            "get_model_info" => Some(WireRequestType::GetModelInfo),
            "llm_request" => Some(WireRequestType::LlmRequest),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            WireRequestType::FusionCommand => "fusion_command",
            WireRequestType::GetModelInfo => "get_model_info",
            WireRequestType::LlmRequest => "llm_request",
        }
    }
}

pub const FIELD_TYPE: &str = "type";
pub const FIELD_COMMAND: &str = "command";
pub const FIELD_PARAMS: &str = "params";
pub const FIELD_PROMPT: &str = "prompt";
pub const FIELD_MODEL: &str = "model";

/// Model used for `llm_request` when the client names none.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Terminator of every frame on the stream.
pub const FRAME_DELIMITER: u8 = b'\n';

/// How many bytes a connection reads from the socket at a time.
///
/// This is a read size, not a message limit: frames larger than one
/// chunk are reassembled by `framing::next_frame`.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Default upper bound on a single frame (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;
