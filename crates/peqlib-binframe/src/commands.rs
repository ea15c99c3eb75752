//! Command codebook and EQ payload codec.
//!
//! Command codes are opaque firmware constants and must be sent exactly as
//! listed. Responses carry the request code with bit 15 cleared.
//!
//! # EQ payload
//!
//! ```text
//! [profile index: u8][band count: u8][total gain: f32 LE][band 0] .. [band n-1]
//!
//! band = [type: u8][gain: f32 LE][freq: f32 LE][q: f32 LE]     (13 bytes)
//! ```
//!
//! Type byte 0 is a low shelf, 2 a high shelf, anything else a peaking
//! filter.

use bytes::{BufMut, BytesMut};
use peqlib_core::error::{Error, Result};
use peqlib_core::types::{Filter, FilterType};

/// Query the active EQ profile.
pub const CMD_READ_EQ_MODE: u16 = 0xC01F;
/// Read the custom profile's bands.
pub const CMD_READ_EQ_VALUES: u16 = 0xC04C;
/// Read the firmware version string.
pub const CMD_READ_FIRMWARE: u16 = 0xC042;
/// Write the custom profile's bands.
pub const CMD_SET_ADVANCED_CUSTOM_EQ: u16 = 0xF041;

pub const RESP_EQ_MODE: u16 = 0x401F;
pub const RESP_EQ_VALUES: u16 = 0x404C;
pub const RESP_FIRMWARE: u16 = 0x4042;

/// Bytes before the first band.
pub const EQ_HEADER_LEN: usize = 6;
/// Bytes per band.
pub const BAND_LEN: usize = 13;

const TYPE_LOW_SHELF: u8 = 0;
const TYPE_PEAKING: u8 = 1;
const TYPE_HIGH_SHELF: u8 = 2;

pub fn type_byte(filter_type: FilterType) -> u8 {
    match filter_type {
        FilterType::LowShelf => TYPE_LOW_SHELF,
        FilterType::Peaking => TYPE_PEAKING,
        FilterType::HighShelf => TYPE_HIGH_SHELF,
    }
}

pub fn parse_type_byte(byte: u8) -> FilterType {
    match byte {
        TYPE_LOW_SHELF => FilterType::LowShelf,
        TYPE_HIGH_SHELF => FilterType::HighShelf,
        _ => FilterType::Peaking,
    }
}

/// Contents of an EQ values payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EqValues {
    pub profile_index: u8,
    pub total_gain: f64,
    pub bands: Vec<Filter>,
}

/// Build the payload for [`CMD_SET_ADVANCED_CUSTOM_EQ`].
///
/// Values are narrowed to `f32`.
pub fn encode_eq_payload(profile_index: u8, total_gain: f64, bands: &[Filter]) -> Result<Vec<u8>> {
    let count = u8::try_from(bands.len())
        .map_err(|_| Error::InvalidParameter(format!("{} bands do not fit a frame", bands.len())))?;

    let mut buf = BytesMut::with_capacity(EQ_HEADER_LEN + bands.len() * BAND_LEN);
    buf.put_u8(profile_index);
    buf.put_u8(count);
    buf.put_f32_le(total_gain as f32);
    for band in bands {
        buf.put_u8(type_byte(band.filter_type));
        buf.put_f32_le(band.gain as f32);
        buf.put_f32_le(band.freq as f32);
        buf.put_f32_le(band.q as f32);
    }
    Ok(buf.to_vec())
}

fn f32_at(payload: &[u8], offset: usize) -> f64 {
    let bytes = [
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ];
    f64::from(f32::from_le_bytes(bytes))
}

/// Parse a [`RESP_EQ_VALUES`] payload.
///
/// Fails with [`Error::Protocol`] when the payload is shorter than its band
/// count implies.
pub fn parse_eq_values(payload: &[u8]) -> Result<EqValues> {
    if payload.len() < EQ_HEADER_LEN {
        return Err(Error::Protocol(format!(
            "EQ values payload too short: {} bytes",
            payload.len()
        )));
    }

    let profile_index = payload[0];
    let count = usize::from(payload[1]);
    let needed = EQ_HEADER_LEN + count * BAND_LEN;
    if payload.len() < needed {
        return Err(Error::Protocol(format!(
            "EQ values payload declares {count} bands ({needed} bytes) but has {}",
            payload.len()
        )));
    }

    let bands = (0..count)
        .map(|i| {
            let at = EQ_HEADER_LEN + i * BAND_LEN;
            Filter::new(
                parse_type_byte(payload[at]),
                f32_at(payload, at + 5),
                f32_at(payload, at + 1),
                f32_at(payload, at + 9),
            )
        })
        .collect();

    Ok(EqValues {
        profile_index,
        total_gain: f32_at(payload, 2),
        bands,
    })
}

/// Active profile id from a [`RESP_EQ_MODE`] payload.
pub fn parse_eq_mode(payload: &[u8]) -> Result<i32> {
    payload
        .first()
        .map(|&id| i32::from(id))
        .ok_or_else(|| Error::Protocol("EQ mode response has an empty payload".into()))
}

/// Firmware version from a [`RESP_FIRMWARE`] payload.
pub fn parse_firmware(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= f64::from(f32::EPSILON) * b.abs().max(1.0)
    }

    #[test]
    fn payload_survives_parse() {
        let bands = vec![
            Filter::low_shelf(105.0, 5.5, 0.71),
            Filter::peaking(2300.0, -2.25, 1.41),
            Filter::high_shelf(9500.0, 3.0, 0.7),
        ];
        let payload = encode_eq_payload(5, -1.5, &bands).unwrap();
        assert_eq!(payload.len(), EQ_HEADER_LEN + 3 * BAND_LEN);

        let parsed = parse_eq_values(&payload).unwrap();
        assert_eq!(parsed.profile_index, 5);
        assert!(close(parsed.total_gain, -1.5));
        for (got, want) in parsed.bands.iter().zip(&bands) {
            assert_eq!(got.filter_type, want.filter_type);
            assert!(close(got.freq, want.freq));
            assert!(close(got.gain, want.gain));
            assert!(close(got.q, want.q));
        }
    }

    #[test]
    fn band_field_order_is_type_gain_freq_q() {
        let payload = encode_eq_payload(0, 0.0, &[Filter::peaking(1000.0, -3.0, 2.0)]).unwrap();
        assert_eq!(payload[6], 1);
        assert_eq!(&payload[7..11], &(-3.0f32).to_le_bytes());
        assert_eq!(&payload[11..15], &1000.0f32.to_le_bytes());
        assert_eq!(&payload[15..19], &2.0f32.to_le_bytes());
    }

    #[test]
    fn unknown_type_bytes_are_peaking() {
        assert_eq!(parse_type_byte(0), FilterType::LowShelf);
        assert_eq!(parse_type_byte(2), FilterType::HighShelf);
        assert_eq!(parse_type_byte(1), FilterType::Peaking);
        assert_eq!(parse_type_byte(7), FilterType::Peaking);
    }

    #[test]
    fn undersized_payload_is_protocol_error() {
        assert!(matches!(parse_eq_values(&[5, 0, 0]), Err(Error::Protocol(_))));

        let mut payload = encode_eq_payload(5, 0.0, &[Filter::peaking(1000.0, 0.0, 1.0)]).unwrap();
        payload[1] = 2;
        assert!(matches!(parse_eq_values(&payload), Err(Error::Protocol(_))));
    }

    #[test]
    fn eq_mode_and_firmware_payloads() {
        assert_eq!(parse_eq_mode(&[2]).unwrap(), 2);
        assert!(matches!(parse_eq_mode(&[]), Err(Error::Protocol(_))));
        assert_eq!(parse_firmware(b"1.0.5\0\0"), "1.0.5");
    }
}
