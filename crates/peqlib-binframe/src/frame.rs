//! Binary frame encoder/decoder.
//!
//! # Frame format
//!
//! ```text
//! 0x55 0x60 0x01 <cmd lo> <cmd hi> <len> 0x00 <op id> [payload (len bytes)] <crc lo> <crc hi>
//! ```
//!
//! - Bytes 0..3: fixed preamble `0x55 0x60 0x01`.
//! - Bytes 3..5: 16-bit command code, little-endian.
//! - Byte 5: payload length (0-255).
//! - Byte 6: reserved, always `0x00`.
//! - Byte 7: operation id, a per-session counter used to correlate log
//!   lines. The device echoes it but nothing depends on it.
//! - Trailer: CRC-16 ([`crc16`]) over header and payload, little-endian.

use bytes::{BufMut, BytesMut};
use peqlib_core::error::{Error, Result};

use crate::crc::crc16;

/// Fixed frame preamble.
pub const PREAMBLE: [u8; 3] = [0x55, 0x60, 0x01];

pub const HEADER_LEN: usize = 8;
pub const CRC_LEN: usize = 2;

/// Largest payload a frame can carry.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u16,
    pub operation_id: u8,
    pub payload: Vec<u8>,
    /// Whether the trailer matched the computed CRC.
    pub crc_valid: bool,
}

/// Result of attempting to decode a frame from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete frame was decoded; `consumed` bytes can be dropped.
    Frame { frame: Frame, consumed: usize },

    /// The buffer starts with bytes that cannot begin a frame. Drop this
    /// many bytes and try again.
    Garbage(usize),

    /// More data is needed.
    Incomplete,
}

/// Encode a command frame.
///
/// Fails with [`Error::InvalidParameter`] if the payload exceeds
/// [`MAX_PAYLOAD_LEN`].
///
/// # Example
///
/// ```
/// use peqlib_binframe::frame::encode_frame;
///
/// let frame = encode_frame(0xC01F, &[], 1).unwrap();
/// assert_eq!(frame, [0x55, 0x60, 0x01, 0x1F, 0xC0, 0x00, 0x00, 0x01, 0x8C, 0xDD]);
/// ```
pub fn encode_frame(command: u16, payload: &[u8], operation_id: u8) -> Result<Vec<u8>> {
    let len = u8::try_from(payload.len()).map_err(|_| {
        Error::InvalidParameter(format!(
            "frame payload of {} bytes exceeds {MAX_PAYLOAD_LEN}",
            payload.len()
        ))
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    buf.put_slice(&PREAMBLE);
    buf.put_u16_le(command);
    buf.put_u8(len);
    buf.put_u8(0x00);
    buf.put_u8(operation_id);
    buf.put_slice(payload);
    let crc = crc16(&buf);
    buf.put_u16_le(crc);
    Ok(buf.to_vec())
}

/// Attempt to decode one frame from the start of `buf`.
pub fn decode_frame(buf: &[u8]) -> DecodeResult {
    if buf.is_empty() {
        return DecodeResult::Incomplete;
    }

    // Resynchronise on the first preamble byte.
    if buf[0] != PREAMBLE[0] {
        let skip = buf
            .iter()
            .position(|&b| b == PREAMBLE[0])
            .unwrap_or(buf.len());
        return DecodeResult::Garbage(skip);
    }

    let known = buf.len().min(PREAMBLE.len());
    if buf[..known] != PREAMBLE[..known] {
        return DecodeResult::Garbage(1);
    }
    if buf.len() < HEADER_LEN {
        return DecodeResult::Incomplete;
    }

    let payload_len = usize::from(buf[5]);
    let total = HEADER_LEN + payload_len + CRC_LEN;
    if buf.len() < total {
        return DecodeResult::Incomplete;
    }

    let body = &buf[..HEADER_LEN + payload_len];
    let trailer = u16::from_le_bytes([buf[total - 2], buf[total - 1]]);

    DecodeResult::Frame {
        frame: Frame {
            command: u16::from_le_bytes([buf[3], buf[4]]),
            operation_id: buf[7],
            payload: buf[HEADER_LEN..HEADER_LEN + payload_len].to_vec(),
            crc_valid: crc16(body) == trailer,
        },
        consumed: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_read_eq_mode_golden() {
        let frame = encode_frame(0xC01F, &[], 1).unwrap();
        assert_eq!(frame, vec![85, 96, 1, 31, 192, 0, 0, 1, 140, 221]);
    }

    #[test]
    fn encode_rejects_oversize_payload() {
        let payload = vec![0u8; 256];
        assert!(matches!(
            encode_frame(0xF041, &payload, 1),
            Err(Error::InvalidParameter(_))
        ));
        assert!(encode_frame(0xF041, &payload[..255], 1).is_ok());
    }

    #[test]
    fn decode_eq_mode_response_golden() {
        let buf = [0x55, 0x60, 0x01, 0x1F, 0x40, 0x01, 0x00, 0x01, 0x02, 0x5D, 0x46];
        match decode_frame(&buf) {
            DecodeResult::Frame { frame, consumed } => {
                assert_eq!(consumed, 11);
                assert_eq!(frame.command, 0x401F);
                assert_eq!(frame.operation_id, 1);
                assert_eq!(frame.payload, vec![0x02]);
                assert!(frame.crc_valid);
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_flags_bad_crc() {
        let mut buf = encode_frame(0x404C, &[1, 2, 3], 9).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        match decode_frame(&buf) {
            DecodeResult::Frame { frame, .. } => assert!(!frame.crc_valid),
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_needs_whole_frame() {
        let buf = encode_frame(0x404C, &[1, 2, 3], 9).unwrap();
        assert_eq!(decode_frame(&buf[..5]), DecodeResult::Incomplete);
        assert_eq!(decode_frame(&buf[..buf.len() - 1]), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_skips_leading_noise() {
        assert_eq!(decode_frame(&[0x00, 0xFF, 0x55, 0x60]), DecodeResult::Garbage(2));
        assert_eq!(decode_frame(&[0x00, 0xFF]), DecodeResult::Garbage(2));
        assert_eq!(decode_frame(&[0x55, 0x61, 0x01]), DecodeResult::Garbage(1));
        assert_eq!(decode_frame(&[0x55, 0x60]), DecodeResult::Incomplete);
    }
}
