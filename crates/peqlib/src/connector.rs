//! Transport connector: picker -> match -> open -> [`ConnectedDevice`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use peqlib_core::descriptor::{DeviceDescriptor, DeviceFilters, device_filters, match_device};
use peqlib_core::device::ConnectedDevice;
use peqlib_core::discovery::{DevicePicker, TransportOpener};
use peqlib_core::error::Result;

/// Connects the device chosen by a [`DevicePicker`].
pub struct Connector {
    table: Vec<DeviceDescriptor>,
    picker: Arc<dyn DevicePicker>,
    opener: Arc<dyn TransportOpener>,
    response_timeout: Duration,
}

impl Connector {
    pub fn new(
        table: Vec<DeviceDescriptor>,
        picker: Arc<dyn DevicePicker>,
        opener: Arc<dyn TransportOpener>,
        response_timeout: Duration,
    ) -> Self {
        Connector {
            table,
            picker,
            opener,
            response_timeout,
        }
    }

    pub fn table(&self) -> &[DeviceDescriptor] {
        &self.table
    }

    /// Filters handed to the picker.
    pub fn filters(&self) -> DeviceFilters {
        device_filters(&self.table)
    }

    /// Pick, match, and open a device.
    ///
    /// Fails with `NoDeviceSelected`, `UnsupportedDevice` or `TransportOpen`;
    /// none of these leave anything open.
    pub async fn connect(&self) -> Result<ConnectedDevice> {
        let filters = self.filters();
        debug!(
            usb_vendor_ids = ?filters.usb_vendor_ids,
            bluetooth_ids = ?filters.bluetooth_service_class_ids,
            "Requesting device from picker"
        );
        let selected = self.picker.pick(&filters).await?;

        let info = match_device(&self.table, &selected.identity).map_err(|e| {
            warn!(
                port = %selected.port,
                identity = %selected.identity,
                "Selected device is not supported"
            );
            e
        })?;

        if info.config.experimental {
            warn!(
                manufacturer = info.manufacturer,
                model = info.model,
                "Support for this model is experimental"
            );
        }

        let baud_rate = info
            .config
            .baud_rate_for(selected.identity.transport_kind());
        let transport = self.opener.open(&selected.port, baud_rate).await?;

        info!(
            port = %selected.port,
            manufacturer = info.manufacturer,
            model = info.model,
            protocol = ?info.protocol,
            baud_rate,
            "Device connected"
        );
        Ok(ConnectedDevice::new(
            info,
            &selected.port,
            transport,
            self.response_timeout,
        ))
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("vendors", &self.table.len())
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::device_table;
    use peqlib_core::descriptor::{ModelConfig, ModelEntry, WireProtocol};
    use peqlib_core::Error;
    use peqlib_test_harness::{MockOpener, MockPicker, MockTransport};

    const BT_UUID: &str = "aeac4a03-dff5-498f-843a-34487cf133eb";

    fn connector(table: Vec<DeviceDescriptor>, picker: MockPicker, opener: MockOpener) -> Connector {
        Connector::new(table, Arc::new(picker), Arc::new(opener), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn usb_device_opens_at_115200() {
        let opener = MockOpener::new(MockTransport::new());
        let picker = MockPicker::usb("/dev/ttyACM0", 0x152a, 0x0088);
        let c = connector(device_table(), picker.clone(), opener.clone());

        let device = c.connect().await.unwrap();
        assert_eq!(device.manufacturer(), "JDS Labs");
        assert_eq!(device.model(), "Element IV");
        assert_eq!(opener.opened(), vec![("/dev/ttyACM0".to_string(), 115_200)]);
        assert_eq!(picker.seen_filters(), vec![c.filters()]);
    }

    #[tokio::test]
    async fn bluetooth_device_opens_at_9600_despite_override() {
        let mut table = device_table();
        table[2].models[0].config.baud_rate = Some(57_600);
        let opener = MockOpener::new(MockTransport::new());
        let c = connector(table, MockPicker::bluetooth("/dev/rfcomm0", BT_UUID), opener.clone());

        let device = c.connect().await.unwrap();
        assert_eq!(device.protocol(), WireProtocol::BinaryFrame);
        assert_eq!(opener.opened()[0].1, 9_600);
    }

    #[tokio::test]
    async fn usb_override_baud_rate_is_used() {
        let table = vec![DeviceDescriptor {
            manufacturer: "Test",
            protocol: WireProtocol::JsonLine,
            usb_vendor_id: Some(0x1234),
            bluetooth_service_class_uuids: Vec::new(),
            models: vec![ModelEntry {
                name: "Slow",
                usb_product_id: Some(1),
                config: ModelConfig {
                    baud_rate: Some(57_600),
                    experimental: true,
                    ..ModelConfig::default()
                },
            }],
        }];
        let opener = MockOpener::new(MockTransport::new());
        let c = connector(table, MockPicker::usb("COM3", 0x1234, 1), opener.clone());

        c.connect().await.unwrap();
        assert_eq!(opener.opened()[0], ("COM3".to_string(), 57_600));
    }

    #[tokio::test]
    async fn unsupported_identity_opens_nothing() {
        let opener = MockOpener::new(MockTransport::new());
        let picker = MockPicker::usb("/dev/ttyUSB0", 0x0403, 0x6001);
        let c = connector(device_table(), picker, opener.clone());

        match c.connect().await {
            Err(Error::UnsupportedDevice(id)) => assert_eq!(id, "usb 0x0403:0x6001"),
            other => panic!("expected UnsupportedDevice, got {other:?}"),
        }
        assert!(opener.opened().is_empty());
    }

    #[tokio::test]
    async fn picker_and_open_failures_surface_directly() {
        let c = connector(device_table(), MockPicker::cancelled(), MockOpener::failing());
        assert!(matches!(c.connect().await, Err(Error::NoDeviceSelected)));

        let c = connector(
            device_table(),
            MockPicker::usb("/dev/ttyACM0", 0x152a, 0x0088),
            MockOpener::failing(),
        );
        assert!(matches!(c.connect().await, Err(Error::TransportOpen(_))));
    }
}
