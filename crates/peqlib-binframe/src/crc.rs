//! CRC-16 used by the binary frame trailer.
//!
//! Bit-reflected, polynomial `0xA001`, initial value `0xFFFF`, no final
//! XOR (the MODBUS variant). Computed bitwise without a table.

const INITIAL: u16 = 0xFFFF;
const POLYNOMIAL: u16 = 0xA001;

/// Compute the CRC over `data`.
///
/// # Example
///
/// ```
/// use peqlib_binframe::crc::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x4B37);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = INITIAL;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
