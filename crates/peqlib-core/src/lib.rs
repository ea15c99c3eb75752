//! peqlib-core: Core traits, types, and error definitions for peqlib.
//!
//! This crate defines the vendor-agnostic abstractions that every peqlib
//! backend implements. Applications depend on these types without pulling in
//! any specific vendor protocol.
//!
//! # Key types
//!
//! - [`PeqHandler`] -- the uniform contract every vendor protocol implements
//! - [`ConnectedDevice`] -- an open, matched device with serialised I/O
//! - [`Transport`] -- byte-level communication channel
//! - [`DeviceDescriptor`] / [`match_device`] -- the device table and matching
//! - [`align`] -- filter alignment onto fixed band layouts
//! - [`Error`] / [`Result`] -- error handling

pub mod align;
pub mod descriptor;
pub mod device;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use peqlib_core::*`.
pub use align::{Alignment, BandLayout, BandLimits, align, clamp_gains};
pub use descriptor::{
    DeviceDescriptor, DeviceFilters, DeviceIdentity, DeviceMatch, ModelConfig, ModelEntry,
    TransportKind, WireProtocol, device_filters, match_device,
};
pub use device::{ConnectedDevice, DEFAULT_RESPONSE_TIMEOUT};
pub use discovery::{DevicePicker, SelectedDevice, TransportOpener};
pub use error::{Error, OperationContext, Result};
pub use handler::PeqHandler;
pub use transport::{Transport, TransportReader, TransportWriter};
pub use types::*;
