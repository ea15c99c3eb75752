//! Serial-port device picker and opener.
//!
//! [`SerialPortPicker`] plays the role of the host device chooser on desktop
//! systems. USB ports are enumerated through tokio-serial and kept when
//! their vendor ID passes the [`DeviceFilters`]. Bluetooth SPP ports
//! (`/dev/rfcommN`, `COMn`) do not expose the remote service class through
//! the serial API, so they are supplied as explicit port/UUID bindings.
//!
//! [`SerialOpener`] opens the chosen port as a [`SerialTransport`].

use async_trait::async_trait;
use tracing::{debug, info};

use peqlib_core::descriptor::{DeviceFilters, DeviceIdentity};
use peqlib_core::discovery::{DevicePicker, SelectedDevice, TransportOpener};
use peqlib_core::error::{Error, Result};
use peqlib_core::transport::Transport;

use crate::serial::SerialTransport;

/// A Bluetooth SPP port and the service class it was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothBinding {
    pub port: String,
    pub service_class_uuid: String,
}

/// A serial port as seen by the OS, reduced to what matching needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub port_name: String,
    /// `(vendor_id, product_id)` for USB ports.
    pub usb_ids: Option<(u16, u16)>,
}

/// Picks the first enumerated port that passes the descriptor filters.
#[derive(Debug, Clone, Default)]
pub struct SerialPortPicker {
    preferred_port: Option<String>,
    bluetooth: Vec<BluetoothBinding>,
}

impl SerialPortPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider this port.
    pub fn port(mut self, port: &str) -> Self {
        self.preferred_port = Some(port.to_string());
        self
    }

    /// Declare a Bluetooth SPP port bound to `service_class_uuid`.
    pub fn bluetooth_port(mut self, port: &str, service_class_uuid: &str) -> Self {
        self.bluetooth.push(BluetoothBinding {
            port: port.to_string(),
            service_class_uuid: service_class_uuid.to_string(),
        });
        self
    }

    /// Every port that passes `filters`, USB ports first.
    pub fn candidates(&self, filters: &DeviceFilters) -> Result<Vec<SelectedDevice>> {
        Ok(select_candidates(
            &enumerate_ports()?,
            &self.bluetooth,
            filters,
            self.preferred_port.as_deref(),
        ))
    }
}

#[async_trait]
impl DevicePicker for SerialPortPicker {
    async fn pick(&self, filters: &DeviceFilters) -> Result<SelectedDevice> {
        let candidates = self.candidates(filters)?;
        debug!(count = candidates.len(), "Serial picker candidates");
        let selected = candidates.into_iter().next().ok_or(Error::NoDeviceSelected)?;
        info!(port = %selected.port, identity = %selected.identity, "Device selected");
        Ok(selected)
    }
}

/// List the serial ports the OS knows about.
pub fn enumerate_ports() -> Result<Vec<PortSummary>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| Error::TransportOpen(format!("failed to enumerate serial ports: {e}")))?;
    Ok(ports
        .into_iter()
        .map(|info| PortSummary {
            usb_ids: match &info.port_type {
                tokio_serial::SerialPortType::UsbPort(usb) => Some((usb.vid, usb.pid)),
                _ => None,
            },
            port_name: info.port_name,
        })
        .collect())
}

/// Apply the picker filters to enumerated ports and Bluetooth bindings.
pub fn select_candidates(
    ports: &[PortSummary],
    bluetooth: &[BluetoothBinding],
    filters: &DeviceFilters,
    preferred_port: Option<&str>,
) -> Vec<SelectedDevice> {
    let wanted = |port: &str| preferred_port.map_or(true, |p| p == port);

    let usb = ports.iter().filter_map(|port| {
        let (vendor_id, product_id) = port.usb_ids?;
        if !wanted(&port.port_name) || !filters.allows_usb_vendor(vendor_id) {
            return None;
        }
        Some(SelectedDevice {
            port: port.port_name.clone(),
            identity: DeviceIdentity::Usb {
                vendor_id,
                product_id,
            },
        })
    });

    let bt = bluetooth.iter().filter_map(|binding| {
        if !wanted(&binding.port) || !filters.allows_bluetooth_uuid(&binding.service_class_uuid) {
            return None;
        }
        Some(SelectedDevice {
            port: binding.port.clone(),
            identity: DeviceIdentity::Bluetooth {
                service_class_uuid: binding.service_class_uuid.clone(),
            },
        })
    });

    usb.chain(bt).collect()
}

/// Opens ports as [`SerialTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

#[async_trait]
impl TransportOpener for SerialOpener {
    async fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>> {
        let transport = SerialTransport::open(port, baud_rate).await?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BT_UUID: &str = "aeac4a03-dff5-498f-843a-34487cf133eb";

    fn filters() -> DeviceFilters {
        DeviceFilters {
            usb_vendor_ids: vec![0x152a, 0x2972],
            bluetooth_service_class_ids: vec![BT_UUID.into()],
            allowed_bluetooth_service_class_ids: vec![BT_UUID.into()],
        }
    }

    fn ports() -> Vec<PortSummary> {
        vec![
            PortSummary {
                port_name: "/dev/ttyS0".into(),
                usb_ids: None,
            },
            PortSummary {
                port_name: "/dev/ttyUSB0".into(),
                usb_ids: Some((0x0403, 0x6001)),
            },
            PortSummary {
                port_name: "/dev/ttyACM0".into(),
                usb_ids: Some((0x152a, 0x88)),
            },
        ]
    }

    #[test]
    fn unrelated_usb_and_plain_ports_are_filtered_out() {
        let selected = select_candidates(&ports(), &[], &filters(), None);
        assert_eq!(
            selected,
            vec![SelectedDevice {
                port: "/dev/ttyACM0".into(),
                identity: DeviceIdentity::Usb {
                    vendor_id: 0x152a,
                    product_id: 0x88,
                },
            }]
        );
    }

    #[test]
    fn bluetooth_bindings_follow_usb_ports() {
        let bindings = vec![
            BluetoothBinding {
                port: "/dev/rfcomm0".into(),
                service_class_uuid: BT_UUID.to_uppercase(),
            },
            BluetoothBinding {
                port: "/dev/rfcomm1".into(),
                service_class_uuid: "00001101-0000-1000-8000-00805f9b34fb".into(),
            },
        ];
        let selected = select_candidates(&ports(), &bindings, &filters(), None);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[1].port, "/dev/rfcomm0");
    }

    #[test]
    fn preferred_port_restricts_selection() {
        let bindings = vec![BluetoothBinding {
            port: "/dev/rfcomm0".into(),
            service_class_uuid: BT_UUID.into(),
        }];
        let selected = select_candidates(&ports(), &bindings, &filters(), Some("/dev/rfcomm0"));
        assert_eq!(selected.len(), 1);
        assert!(matches!(selected[0].identity, DeviceIdentity::Bluetooth { .. }));

        let none = select_candidates(&ports(), &bindings, &filters(), Some("/dev/ttyUSB0"));
        assert!(none.is_empty());
    }
}
