//! mcp-protocol
//!
//! Wire-level encoding/decoding for the relay.
//!
//! This crate turns raw bytes from a TCP stream into logical
//! `mcp_core` messages and back again.
//!
//! - [`framing`]    : newline-delimited frames over a byte stream
//! - [`json_codec`] : one JSON document per frame
//! - [`wire_types`] : tags, field names and limits

pub mod wire_types;
pub mod framing;
pub mod json_codec;

pub use framing::{encode_frame, next_frame, FrameError};
pub use json_codec::{
    decode_message,
    encode_message,
    encode_response,
    parse_request,
    DecodeError,
};
