//! NUL-delimited JSON PEQ protocol backend for peqlib.
//!
//! This crate implements the JSON text protocol spoken by JDS Labs devices.
//! It provides:
//!
//! - **Protocol codec** ([`protocol`]) -- NUL-terminated JSON framing.
//! - **Command builders** ([`commands`]) -- describe/update requests, the
//!   12-band positional layout, and response parsers.
//! - **Model definitions** ([`models`]) -- the JDS Labs descriptor.
//! - **Handler** ([`handler`]) -- [`PeqHandler`](peqlib_core::PeqHandler)
//!   implementation.
//!
//! # Example
//!
//! ```
//! use peqlib_jsonline::commands::{describe_request, parse_input_mode};
//! use peqlib_jsonline::protocol::{DecodeResult, decode_response, encode_request};
//!
//! let request = encode_request(&describe_request("JDS Labs Element IV")).unwrap();
//! assert_eq!(request.last(), Some(&0));
//!
//! let reply = b"{\"Configuration\":{\"General\":{\"Input Mode\":{\"Current\":\"USB\"}}}}\0";
//! if let DecodeResult::Response { value, .. } = decode_response(reply) {
//!     assert_eq!(parse_input_mode(&value).unwrap(), 0);
//! }
//! ```

pub mod commands;
pub mod handler;
pub mod models;
pub mod protocol;

pub use handler::JsonLineHandler;
pub use models::jds_labs;
