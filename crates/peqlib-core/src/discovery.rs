//! Device discovery seams.
//!
//! The connector does not enumerate hardware itself. It asks a
//! [`DevicePicker`] (the host environment's device chooser) for one device,
//! restricted to the [`DeviceFilters`] built from the descriptor table, and
//! then asks a [`TransportOpener`] to open the chosen port at the resolved
//! baud rate.

use async_trait::async_trait;

use crate::descriptor::{DeviceFilters, DeviceIdentity};
use crate::error::Result;
use crate::transport::Transport;

/// A device chosen by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDevice {
    /// OS port path (e.g. `/dev/ttyACM0`, `/dev/rfcomm0`, `COM5`).
    pub port: String,
    pub identity: DeviceIdentity,
}

/// Host device picker.
#[async_trait]
pub trait DevicePicker: Send + Sync {
    /// Return one device whose identity passes `filters`, or
    /// [`Error::NoDeviceSelected`](crate::error::Error::NoDeviceSelected).
    async fn pick(&self, filters: &DeviceFilters) -> Result<SelectedDevice>;
}

/// Opens a byte stream to a selected port.
#[async_trait]
pub trait TransportOpener: Send + Sync {
    /// Open `port` at `baud_rate`. Failures map to
    /// [`Error::TransportOpen`](crate::error::Error::TransportOpen).
    async fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>>;
}
