//! JSON encoding/decoding of single frames.
//!
//! This module converts between:
//! - one frame's bytes (`&[u8]`, no delimiter)
//! - the `mcp_core` envelope types ([`Message`], [`Request`], [`Response`])
//!
//! Decoding is strict about the envelope (it must be a JSON object) and
//! lenient about its fields: a missing `params` becomes `{}`, a missing
//! `prompt` becomes `""`, and so on. Text fields (`command`, `prompt`,
//! `model`) holding anything other than a string are treated as missing.
//! A missing `type` is not a decode error; [`parse_request`] reports it
//! so the server can answer it.

use mcp_core::{Message, Request, Response};
use serde_json::Value;
use thiserror::Error;

use crate::wire_types::{
    WireRequestType, FIELD_COMMAND, FIELD_MODEL, FIELD_PARAMS, FIELD_PROMPT, FIELD_TYPE,
};

/// Errors from decoding a frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not valid JSON (or not UTF-8).
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Decode one frame into a message envelope.
pub fn decode_message(buf: &[u8]) -> Result<Message, DecodeError> {
    match serde_json::from_slice::<Value>(buf)? {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject(json_kind(&other))),
    }
}

/// Interpret an envelope as a typed request.
///
/// Returns `None` when the `type` field is absent. A non-string `type` is
/// kept as [`Request::Unknown`] with its JSON text.
pub fn parse_request(msg: &Message) -> Option<Request> {
    let tag = match msg.get(FIELD_TYPE)? {
        Value::String(s) => s.as_str(),
        other => return Some(Request::Unknown(other.to_string())),
    };

    let request = match WireRequestType::from_tag(tag) {
        Some(WireRequestType::FusionCommand) => Request::FusionCommand {
            command: text_field(msg, FIELD_COMMAND),
            params: match msg.get(FIELD_PARAMS) {
                None | Some(Value::Null) => Value::Object(Default::default()),
                Some(v) => v.clone(),
            },
        },
        Some(WireRequestType::GetModelInfo) => Request::GetModelInfo,
        Some(WireRequestType::LlmRequest) => Request::LlmRequest {
            prompt: text_field(msg, FIELD_PROMPT).unwrap_or_default(),
            model: text_field(msg, FIELD_MODEL),
        },
        None => Request::Unknown(tag.to_string()),
    };

    Some(request)
}

/// Serialize a response as one frame payload (no delimiter).
pub fn encode_response(resp: &Response) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(resp)
}

/// Serialize an arbitrary envelope (client → server).
pub fn encode_message(msg: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(msg)
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

/// A string field. Absent, `null` and non-string values are all `None`.
fn text_field(msg: &Message, key: &str) -> Option<String> {
    msg.get(key).and_then(Value::as_str).map(str::to_string)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(v: Value) -> Message {
        match v {
            Value::Object(map) => map,
            _ => panic!("test message must be an object"),
        }
    }

    #[test]
    fn decode_accepts_objects_only() {
        assert!(decode_message(br#"{"type":"get_model_info"}"#).is_ok());
        assert!(matches!(
            decode_message(b"[1,2]"),
            Err(DecodeError::NotAnObject("an array"))
        ));
        assert!(matches!(
            decode_message(b"{not json"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            decode_message(&[0xff, 0xfe]),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn fusion_command_defaults_params() {
        let req = parse_request(&msg(json!({"type": "fusion_command", "command": "extrude"})));
        assert_eq!(
            req,
            Some(Request::FusionCommand {
                command: Some("extrude".to_string()),
                params: json!({}),
            })
        );
    }

    #[test]
    fn fusion_command_without_command_is_not_an_error() {
        let req = parse_request(&msg(json!({"type": "fusion_command", "params": {"r": 1}})));
        assert_eq!(
            req,
            Some(Request::FusionCommand {
                command: None,
                params: json!({"r": 1}),
            })
        );
    }

    #[test]
    fn non_string_text_fields_count_as_absent() {
        let req = parse_request(&msg(json!({"type": "fusion_command", "command": 5})));
        assert_eq!(
            req,
            Some(Request::FusionCommand {
                command: None,
                params: json!({}),
            })
        );

        let req = parse_request(&msg(
            json!({"type": "llm_request", "prompt": ["a"], "model": 4}),
        ));
        assert_eq!(
            req,
            Some(Request::LlmRequest {
                prompt: String::new(),
                model: None,
            })
        );
    }

    #[test]
    fn llm_request_defaults() {
        let req = parse_request(&msg(json!({"type": "llm_request"})));
        assert_eq!(
            req,
            Some(Request::LlmRequest {
                prompt: String::new(),
                model: None,
            })
        );

        let req = parse_request(&msg(
            json!({"type": "llm_request", "prompt": "hi", "model": "gpt-4o"}),
        ));
        assert_eq!(
            req,
            Some(Request::LlmRequest {
                prompt: "hi".to_string(),
                model: Some("gpt-4o".to_string()),
            })
        );
    }

    #[test]
    fn missing_and_unknown_types() {
        assert_eq!(parse_request(&msg(json!({"command": "x"}))), None);
        assert_eq!(
            parse_request(&msg(json!({"type": "bogus"}))),
            Some(Request::Unknown("bogus".to_string()))
        );
        assert_eq!(
            parse_request(&msg(json!({"type": 7}))),
            Some(Request::Unknown("7".to_string()))
        );
    }

    #[test]
    fn encoded_response_is_single_line() {
        let bytes = encode_response(&Response::error("line one\nline two")).unwrap();
        assert!(!bytes.contains(&b'\n'));
    }
}
