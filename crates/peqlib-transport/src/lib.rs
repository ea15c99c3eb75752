//! Transport implementations for peqlib.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](peqlib_core::Transport) trait and the discovery seams from
//! `peqlib-core`:
//!
//! - [`SerialTransport`]: USB virtual COM ports and Bluetooth SPP ports
//! - [`SerialPortPicker`]: enumerates serial ports and applies the
//!   descriptor table's picker filters
//! - [`SerialOpener`]: opens the chosen port as a [`SerialTransport`]

pub mod picker;
pub mod serial;

pub use picker::{
    BluetoothBinding, PortSummary, SerialOpener, SerialPortPicker, enumerate_ports,
    select_candidates,
};
pub use serial::{SerialReader, SerialTransport, SerialWriter};
