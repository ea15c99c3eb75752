//! peqlib-test-harness: Test utilities and mock transports for peqlib.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! protocol handlers without requiring real hardware, plus [`MockPicker`]
//! and [`MockOpener`] for driving the connector and session manager.

pub mod mock_picker;
pub mod mock_serial;

pub use mock_picker::{MockOpener, MockPicker};
pub use mock_serial::{MockTransport, SentLog};
