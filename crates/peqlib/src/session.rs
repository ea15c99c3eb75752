//! Session manager: the upward interface of the library.
//!
//! The manager tracks connected devices in connection order; the most
//! recent one is current and every operation targets it. Each device is
//! bound to its own [`VendorHandler`] at connect time.
//!
//! Every device operation is bounded by the operation timeout and fails
//! with [`Error::Timeout`] when it expires. Failures are wrapped in
//! [`Error::Operation`] naming the device, operation and slot. A failure
//! that leaves the transport unusable evicts and closes the device.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use peqlib_core::device::ConnectedDevice;
use peqlib_core::error::{Error, Result};
use peqlib_core::handler::PeqHandler;
use peqlib_core::types::{EqProfile, Filter, PushReport, Slot};

use crate::connector::Connector;
use crate::vendor::VendorHandler;

/// Default bound on one session operation, including every exchange it
/// makes.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected device and the handler bound to it.
#[derive(Debug)]
pub struct BoundDevice {
    device: ConnectedDevice,
    handler: VendorHandler,
}

impl BoundDevice {
    pub fn new(device: ConnectedDevice) -> Self {
        let handler = VendorHandler::for_device(&device);
        BoundDevice { device, handler }
    }

    pub fn device(&self) -> &ConnectedDevice {
        &self.device
    }

    pub fn handler(&self) -> &VendorHandler {
        &self.handler
    }
}

pub struct SessionManager {
    connector: Connector,
    devices: Mutex<Vec<Arc<BoundDevice>>>,
    operation_timeout: Duration,
}

impl SessionManager {
    pub fn new(connector: Connector, operation_timeout: Duration) -> Self {
        SessionManager {
            connector,
            devices: Mutex::new(Vec::new()),
            operation_timeout,
        }
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Connect a device through the picker and make it current.
    pub async fn get_device_connected(&self) -> Result<Arc<BoundDevice>> {
        let device = self.connector.connect().await?;
        let bound = Arc::new(BoundDevice::new(device));
        self.devices.lock().await.push(bound.clone());
        Ok(bound)
    }

    /// The current device, if any.
    pub async fn get_current_device(&self) -> Option<Arc<BoundDevice>> {
        self.devices.lock().await.last().cloned()
    }

    /// Disconnect and forget the current device. Does nothing when no
    /// device is connected.
    pub async fn disconnect_device(&self) {
        let current = self.devices.lock().await.pop();
        match current {
            Some(bound) => bound.device.disconnect().await,
            None => debug!("No device to disconnect"),
        }
    }

    /// Slots declared for the current device's model.
    pub async fn get_available_slots(&self) -> Result<Vec<Slot>> {
        let bound = self.current().await?;
        Ok(bound.device.config().available_slots.clone())
    }

    pub async fn get_current_slot(&self) -> Result<i32> {
        let bound = self.current().await?;
        let operation = bound.handler.get_current_slot(&bound.device);
        self.guard(&bound, "getCurrentSlot", None, operation).await
    }

    pub async fn pull_from_device(&self, slot: i32) -> Result<EqProfile> {
        let bound = self.current().await?;
        let operation = bound.handler.pull_from_device(&bound.device, slot);
        self.guard(&bound, "pullFromDevice", Some(slot), operation)
            .await
    }

    /// Write `filters` to `slot`.
    ///
    /// On models that drop the link after saving, the device is
    /// disconnected and [`PushReport::disconnected`] is set.
    pub async fn push_to_device(
        &self,
        slot: i32,
        global_gain: f64,
        filters: &[Filter],
    ) -> Result<PushReport> {
        let bound = self.current().await?;
        let operation = bound
            .handler
            .push_to_device(&bound.device, slot, global_gain, filters);
        let mut report = self
            .guard(&bound, "pushToDevice", Some(slot), operation)
            .await?;

        for warning in &report.warnings {
            warn!(model = bound.device.model(), slot, "{warning}");
        }

        if bound.device.config().disconnect_on_save {
            info!(
                model = bound.device.model(),
                "Device disconnects after saving; closing session"
            );
            self.evict(&bound).await;
            report.disconnected = true;
        }
        Ok(report)
    }

    pub async fn enable_peq(&self, enabled: bool, slot: i32) -> Result<()> {
        let bound = self.current().await?;
        let operation = bound.handler.enable_peq(&bound.device, enabled, slot);
        self.guard(&bound, "enablePEQ", Some(slot), operation).await
    }

    /// Firmware version of the current device, where the protocol reports
    /// one.
    pub async fn read_firmware(&self) -> Result<String> {
        let bound = self.current().await?;
        let operation = bound.handler.read_firmware(&bound.device);
        self.guard(&bound, "readFirmware", None, operation).await
    }

    async fn current(&self) -> Result<Arc<BoundDevice>> {
        self.get_current_device().await.ok_or(Error::NoActiveDevice)
    }

    /// Run `operation` under the operation timeout and apply the error
    /// policy.
    async fn guard<T>(
        &self,
        bound: &Arc<BoundDevice>,
        operation_name: &'static str,
        slot: Option<i32>,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let result = match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        };

        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                let context = bound.device.context(operation_name, slot);
                warn!(context = %context, error = %e, "Device operation failed");
                if e.is_unrecoverable() {
                    warn!(context = %context, "Transport unusable; disconnecting device");
                    self.evict(bound).await;
                }
                Err(e.in_operation(context))
            }
        }
    }

    async fn evict(&self, bound: &Arc<BoundDevice>) {
        self.devices
            .lock()
            .await
            .retain(|other| !Arc::ptr_eq(other, bound));
        bound.device.disconnect().await;
    }
}
