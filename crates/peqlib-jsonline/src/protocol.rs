//! NUL-delimited JSON framing.
//!
//! Every request is one JSON object followed by a single NUL byte, written in
//! one transport write. Responses use the same framing:
//!
//! ```text
//! {"Status":true,...}\0
//! ```
//!
//! Only the JSON before the first NUL is parsed. Anything buffered after the
//! terminator is discarded by the caller, so a device that pipelines two
//! responses back to back loses the second one.

use peqlib_core::error::{Error, Result};
use serde_json::Value;

/// Frame terminator.
pub const TERMINATOR: u8 = 0x00;

/// Result of attempting to decode a response from a byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    /// A complete JSON object was decoded.
    Response {
        value: Value,
        /// Bytes consumed from the buffer, including the terminator.
        consumed: usize,
    },

    /// A terminator was found but the text before it is not a JSON object.
    Malformed {
        reason: String,
        consumed: usize,
    },

    /// No terminator yet. More data is needed.
    Incomplete,
}

/// Serialize `request` and append the terminator.
///
/// # Example
///
/// ```
/// use peqlib_jsonline::protocol::encode_request;
///
/// let bytes = encode_request(&serde_json::json!({"Action": "Describe"})).unwrap();
/// assert_eq!(bytes, b"{\"Action\":\"Describe\"}\0");
/// ```
pub fn encode_request(request: &Value) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(request)
        .map_err(|e| Error::InvalidParameter(format!("request is not serializable: {e}")))?;
    bytes.push(TERMINATOR);
    Ok(bytes)
}

/// Attempt to decode one response from `buf`.
pub fn decode_response(buf: &[u8]) -> DecodeResult {
    let term_pos = match buf.iter().position(|&b| b == TERMINATOR) {
        Some(pos) => pos,
        None => return DecodeResult::Incomplete,
    };
    let consumed = term_pos + 1;

    match serde_json::from_slice::<Value>(&buf[..term_pos]) {
        Ok(value) if value.is_object() => DecodeResult::Response { value, consumed },
        Ok(other) => DecodeResult::Malformed {
            reason: format!("expected a JSON object, got {other}"),
            consumed,
        },
        Err(e) => DecodeResult::Malformed {
            reason: format!("invalid JSON response: {e}"),
            consumed,
        },
    }
}
