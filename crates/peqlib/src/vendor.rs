//! Closed dispatch over the vendor handlers.
//!
//! The descriptor's [`WireProtocol`] tag selects the variant; no matching
//! logic lives here.

use async_trait::async_trait;

use peqlib_binframe::BinaryFrameHandler;
use peqlib_core::descriptor::WireProtocol;
use peqlib_core::device::ConnectedDevice;
use peqlib_core::error::{Error, Result};
use peqlib_core::handler::PeqHandler;
use peqlib_core::types::{EqProfile, Filter, PushReport};
use peqlib_fiio::FiioHandler;
use peqlib_jsonline::JsonLineHandler;

/// One handler instance, owned by one connected device.
#[derive(Debug)]
pub enum VendorHandler {
    JsonLine(JsonLineHandler),
    BinaryFrame(BinaryFrameHandler),
    Fiio(FiioHandler),
}

impl VendorHandler {
    /// Fresh handler state for `protocol`.
    pub fn for_protocol(protocol: WireProtocol) -> Self {
        match protocol {
            WireProtocol::JsonLine => VendorHandler::JsonLine(JsonLineHandler::new()),
            WireProtocol::BinaryFrame => VendorHandler::BinaryFrame(BinaryFrameHandler::new()),
            WireProtocol::Fiio => VendorHandler::Fiio(FiioHandler::new()),
        }
    }

    pub fn for_device(device: &ConnectedDevice) -> Self {
        Self::for_protocol(device.protocol())
    }

    fn inner(&self) -> &dyn PeqHandler {
        match self {
            VendorHandler::JsonLine(h) => h,
            VendorHandler::BinaryFrame(h) => h,
            VendorHandler::Fiio(h) => h,
        }
    }

    /// Firmware version, where the protocol exposes it.
    pub async fn read_firmware(&self, device: &ConnectedDevice) -> Result<String> {
        match self {
            VendorHandler::BinaryFrame(h) => h.read_firmware(device).await,
            _ => Err(Error::Unsupported(format!(
                "{} {} does not report a firmware version",
                device.manufacturer(),
                device.model()
            ))),
        }
    }
}

#[async_trait]
impl PeqHandler for VendorHandler {
    async fn get_current_slot(&self, device: &ConnectedDevice) -> Result<i32> {
        self.inner().get_current_slot(device).await
    }

    async fn pull_from_device(&self, device: &ConnectedDevice, slot: i32) -> Result<EqProfile> {
        self.inner().pull_from_device(device, slot).await
    }

    async fn push_to_device(
        &self,
        device: &ConnectedDevice,
        slot: i32,
        global_gain: f64,
        filters: &[Filter],
    ) -> Result<PushReport> {
        self.inner()
            .push_to_device(device, slot, global_gain, filters)
            .await
    }

    async fn enable_peq(&self, device: &ConnectedDevice, enabled: bool, slot: i32) -> Result<()> {
        self.inner().enable_peq(device, enabled, slot).await
    }
}
