//! Newline-delimited framing over a TCP byte stream.
//!
//! TCP delivers bytes, not messages: one `read` may hold half a document
//! or several of them. Every document is therefore written as a single
//! line terminated by [`FRAME_DELIMITER`], and the reader accumulates
//! bytes until a whole line is available.
//!
//! ```text
//! {"type":"get_model_info"}\n{"type":"fusion_command",...}\n
//! ```
//!
//! Compact JSON never contains a raw newline (newlines inside strings are
//! escaped), so the delimiter is unambiguous. A trailing `\r` is tolerated
//! and blank lines are skipped.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

use crate::wire_types::FRAME_DELIMITER;

/// Framing failures. All of them are fatal to the connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A frame (or an unterminated partial frame) grew past the limit.
    #[error("frame exceeds {limit} bytes")]
    TooLong { limit: usize },
}

/// Pop the next complete frame off the front of `buf`.
///
/// Returns `Ok(None)` when more bytes are needed. The returned frame has
/// its line terminator stripped.
pub fn next_frame(buf: &mut BytesMut, max_len: usize) -> Result<Option<BytesMut>, FrameError> {
    while let Some(pos) = buf.iter().position(|&b| b == FRAME_DELIMITER) {
        let mut line = buf.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        if line.len() > max_len {
            return Err(FrameError::TooLong { limit: max_len });
        }

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return Ok(Some(line));
    }

    if buf.len() > max_len {
        return Err(FrameError::TooLong { limit: max_len });
    }

    Ok(None)
}

/// Append `payload` as one frame to `out`.
pub fn encode_frame(payload: &[u8], out: &mut BytesMut) {
    out.reserve(payload.len() + 1);
    out.put_slice(payload);
    out.put_u8(FRAME_DELIMITER);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_terminator() {
        let mut buf = BytesMut::from(&b"{\"type\":"[..]);
        assert_eq!(next_frame(&mut buf, 1024).unwrap(), None);

        buf.extend_from_slice(b"\"get_model_info\"}\n");
        let frame = next_frame(&mut buf, 1024).unwrap().unwrap();
        assert_eq!(&frame[..], b"{\"type\":\"get_model_info\"}");
        assert!(buf.is_empty());
    }

    #[test]
    fn splits_coalesced_frames() {
        let mut buf = BytesMut::from(&b"{\"a\":1}\r\n\n{\"b\":2}\n{\"c\""[..]);

        assert_eq!(&next_frame(&mut buf, 1024).unwrap().unwrap()[..], b"{\"a\":1}");
        assert_eq!(&next_frame(&mut buf, 1024).unwrap().unwrap()[..], b"{\"b\":2}");
        assert_eq!(next_frame(&mut buf, 1024).unwrap(), None);
        assert_eq!(&buf[..], b"{\"c\"");
    }

    #[test]
    fn rejects_oversized_partial_frame() {
        let mut buf = BytesMut::from(&[b'x'; 17][..]);
        assert_eq!(
            next_frame(&mut buf, 16),
            Err(FrameError::TooLong { limit: 16 })
        );
    }

    #[test]
    fn rejects_oversized_complete_frame() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'x'; 20]);
        buf.extend_from_slice(b"\n");
        assert!(next_frame(&mut buf, 16).is_err());
    }

    #[test]
    fn encode_appends_delimiter() {
        let mut out = BytesMut::new();
        encode_frame(b"{}", &mut out);
        encode_frame(b"[]", &mut out);
        assert_eq!(&out[..], b"{}\n[]\n");
    }
}
