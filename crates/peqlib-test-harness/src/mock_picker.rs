//! Mock discovery seams.
//!
//! [`MockPicker`] always selects the same device and [`MockOpener`] hands out
//! pre-built transports in order, so the connector and session manager can be tested
//! end to end without enumerating real ports.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use peqlib_core::descriptor::{DeviceFilters, DeviceIdentity};
use peqlib_core::discovery::{DevicePicker, SelectedDevice, TransportOpener};
use peqlib_core::error::{Error, Result};
use peqlib_core::transport::Transport;

/// A picker that returns a fixed selection, or [`Error::NoDeviceSelected`].
#[derive(Debug, Clone)]
pub struct MockPicker {
    selection: Option<SelectedDevice>,
    seen_filters: Arc<Mutex<Vec<DeviceFilters>>>,
}

impl MockPicker {
    /// Select a USB device on `port`.
    pub fn usb(port: &str, vendor_id: u16, product_id: u16) -> Self {
        Self::select(SelectedDevice {
            port: port.to_string(),
            identity: DeviceIdentity::Usb {
                vendor_id,
                product_id,
            },
        })
    }

    /// Select a Bluetooth SPP device on `port`.
    pub fn bluetooth(port: &str, service_class_uuid: &str) -> Self {
        Self::select(SelectedDevice {
            port: port.to_string(),
            identity: DeviceIdentity::Bluetooth {
                service_class_uuid: service_class_uuid.to_string(),
            },
        })
    }

    /// Simulate the user dismissing the chooser.
    pub fn cancelled() -> Self {
        MockPicker {
            selection: None,
            seen_filters: Arc::default(),
        }
    }

    fn select(selection: SelectedDevice) -> Self {
        MockPicker {
            selection: Some(selection),
            seen_filters: Arc::default(),
        }
    }

    /// Filters passed to every `pick()` call so far.
    pub fn seen_filters(&self) -> Vec<DeviceFilters> {
        self.seen_filters
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DevicePicker for MockPicker {
    async fn pick(&self, filters: &DeviceFilters) -> Result<SelectedDevice> {
        if let Ok(mut seen) = self.seen_filters.lock() {
            seen.push(filters.clone());
        }
        self.selection.clone().ok_or(Error::NoDeviceSelected)
    }
}

/// An opener that yields pre-built transports, one per `open()`.
///
/// Once the queue is empty `open()` fails with [`Error::TransportOpen`], as
/// does every call on an opener built with [`MockOpener::failing`].
#[derive(Clone)]
pub struct MockOpener {
    transports: Arc<Mutex<VecDeque<Box<dyn Transport>>>>,
    opened: Arc<Mutex<Vec<(String, u32)>>>,
}

impl MockOpener {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        MockOpener {
            transports: Arc::new(Mutex::new(VecDeque::from([
                Box::new(transport) as Box<dyn Transport>
            ]))),
            opened: Arc::default(),
        }
    }

    /// Queue another transport for the next `open()`.
    pub fn then<T: Transport + 'static>(self, transport: T) -> Self {
        if let Ok(mut queue) = self.transports.lock() {
            queue.push_back(Box::new(transport));
        }
        self
    }

    /// An opener whose port can never be opened.
    pub fn failing() -> Self {
        MockOpener {
            transports: Arc::default(),
            opened: Arc::default(),
        }
    }

    /// `(port, baud_rate)` of every `open()` call so far.
    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for MockOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockOpener")
            .field("opened", &self.opened())
            .finish()
    }
}

#[async_trait]
impl TransportOpener for MockOpener {
    async fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push((port.to_string(), baud_rate));
        }
        let transport = self
            .transports
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        transport.ok_or_else(|| Error::TransportOpen(format!("{port}: permission denied")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockTransport;

    #[tokio::test]
    async fn picker_returns_selection_and_records_filters() {
        let picker = MockPicker::usb("/dev/ttyACM0", 0x152a, 0x88);
        let filters = DeviceFilters {
            usb_vendor_ids: vec![0x152a],
            ..Default::default()
        };
        let selected = picker.pick(&filters).await.unwrap();
        assert_eq!(selected.port, "/dev/ttyACM0");
        assert_eq!(picker.seen_filters(), vec![filters]);
    }

    #[tokio::test]
    async fn cancelled_picker_selects_nothing() {
        let picker = MockPicker::cancelled();
        let result = picker.pick(&DeviceFilters::default()).await;
        assert!(matches!(result, Err(Error::NoDeviceSelected)));
    }

    #[tokio::test]
    async fn opener_hands_out_transport_once() {
        let opener = MockOpener::new(MockTransport::new());
        assert!(opener.open("/dev/ttyACM0", 115_200).await.is_ok());
        assert!(matches!(
            opener.open("/dev/ttyACM0", 115_200).await,
            Err(Error::TransportOpen(_))
        ));
        assert_eq!(opener.opened().len(), 2);
        assert_eq!(opener.opened()[0], ("/dev/ttyACM0".to_string(), 115_200));
    }

    #[tokio::test]
    async fn opener_hands_out_queued_transports_in_order() {
        let mut first = MockTransport::new();
        first.set_connected(false);
        let opener = MockOpener::new(first).then(MockTransport::new());

        let a = opener.open("/dev/ttyACM0", 115_200).await.unwrap();
        let b = opener.open("/dev/ttyACM1", 115_200).await.unwrap();
        assert!(!a.is_connected());
        assert!(b.is_connected());
        assert!(opener.open("/dev/ttyACM2", 115_200).await.is_err());
    }
}
