//! CRC16-framed binary PEQ protocol backend for peqlib.
//!
//! This crate implements the binary protocol spoken by Bluetooth headphones
//! from the "Nothing" line. It provides:
//!
//! - **CRC** ([`crc`]) -- the CRC-16 frame trailer.
//! - **Frame codec** ([`frame`]) -- header/payload/CRC framing with
//!   resynchronisation on noise.
//! - **Commands** ([`commands`]) -- the command codebook and the EQ payload
//!   encoder/parser.
//! - **Model definitions** ([`models`]) -- the vendor descriptor.
//! - **Handler** ([`handler`]) -- [`PeqHandler`](peqlib_core::PeqHandler)
//!   implementation.
//!
//! # Example
//!
//! ```
//! use peqlib_binframe::commands::{CMD_READ_EQ_MODE, RESP_EQ_MODE, parse_eq_mode};
//! use peqlib_binframe::frame::{DecodeResult, decode_frame, encode_frame};
//!
//! let request = encode_frame(CMD_READ_EQ_MODE, &[], 1).unwrap();
//! assert_eq!(&request[..3], &[0x55, 0x60, 0x01]);
//!
//! let reply = [0x55, 0x60, 0x01, 0x1F, 0x40, 0x01, 0x00, 0x01, 0x02, 0x5D, 0x46];
//! if let DecodeResult::Frame { frame, .. } = decode_frame(&reply) {
//!     assert_eq!(frame.command, RESP_EQ_MODE);
//!     assert_eq!(parse_eq_mode(&frame.payload).unwrap(), 2);
//! }
//! ```

pub mod commands;
pub mod crc;
pub mod frame;
pub mod handler;
pub mod models;

pub use handler::BinaryFrameHandler;
pub use models::nothing;
