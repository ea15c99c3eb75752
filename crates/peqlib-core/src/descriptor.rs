//! Device descriptor data model and matching.
//!
//! A [`DeviceDescriptor`] describes one vendor: how to recognise its devices
//! (USB vendor ID, Bluetooth service-class UUIDs) and the per-model
//! capability constraints ([`ModelConfig`]). Descriptors are pure data; the
//! [`WireProtocol`] tag tells the facade which handler to construct, but no
//! control flow lives here.
//!
//! [`match_device`] walks a descriptor table in order and returns the first
//! match. Table order is a priority order.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::Slot;

/// Default baud rate for USB virtual COM ports.
pub const DEFAULT_USB_BAUD_RATE: u32 = 115_200;

/// Baud rate used for Bluetooth SPP links.
pub const DEFAULT_BLUETOOTH_BAUD_RATE: u32 = 9_600;

/// Which protocol family a vendor speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WireProtocol {
    /// NUL-terminated JSON request/response.
    JsonLine,
    /// Fixed-layout binary frames with a CRC16 trailer.
    BinaryFrame,
    /// FiiO; framing not available.
    Fiio,
}

/// How the device is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportKind {
    UsbSerial,
    BluetoothSpp,
}

/// The identity a physical device exposes to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceIdentity {
    Usb { vendor_id: u16, product_id: u16 },
    Bluetooth { service_class_uuid: String },
}

impl DeviceIdentity {
    pub fn transport_kind(&self) -> TransportKind {
        match self {
            DeviceIdentity::Usb { .. } => TransportKind::UsbSerial,
            DeviceIdentity::Bluetooth { .. } => TransportKind::BluetoothSpp,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceIdentity::Usb {
                vendor_id,
                product_id,
            } => write!(f, "usb {vendor_id:#06x}:{product_id:#06x}"),
            DeviceIdentity::Bluetooth { service_class_uuid } => {
                write!(f, "bluetooth {service_class_uuid}")
            }
        }
    }
}

/// Per-model capability constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub min_gain: f64,
    pub max_gain: f64,
    /// Total number of bands the firmware exposes.
    pub max_filters: u32,
    pub first_writable_eq_slot: i32,
    pub max_writable_eq_slots: u32,
    /// The device drops the connection after saving (e.g. it reboots).
    pub disconnect_on_save: bool,
    /// Preset id that means "EQ off" on devices that model bypass as a preset.
    pub disabled_preset_id: i32,
    /// Support is not yet verified against hardware.
    pub experimental: bool,
    pub available_slots: Vec<Slot>,
    /// Override for the USB-serial baud rate.
    pub baud_rate: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            min_gain: -12.0,
            max_gain: 12.0,
            max_filters: 10,
            first_writable_eq_slot: 0,
            max_writable_eq_slots: 1,
            disconnect_on_save: false,
            disabled_preset_id: -1,
            experimental: false,
            available_slots: Vec::new(),
            baud_rate: None,
        }
    }
}

impl ModelConfig {
    /// Whether `slot` lies inside the contiguous writable window.
    pub fn is_writable_slot(&self, slot: i32) -> bool {
        let first = i64::from(self.first_writable_eq_slot);
        let end = first + i64::from(self.max_writable_eq_slots);
        let slot = i64::from(slot);
        slot >= first && slot < end
    }

    /// The writable slot ids, in ascending order.
    pub fn writable_slots(&self) -> Vec<i32> {
        (0..self.max_writable_eq_slots as i32)
            .map(|offset| self.first_writable_eq_slot + offset)
            .collect()
    }

    /// Fail with [`Error::Capability`] unless `slot` is writable.
    pub fn ensure_writable(&self, model: &str, slot: i32) -> Result<()> {
        if self.is_writable_slot(slot) {
            return Ok(());
        }
        let allowed = self
            .writable_slots()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::Capability(format!(
            "slot {slot} is not writable on {model}; writable slots: [{allowed}]"
        )))
    }

    /// Look up a slot's display name.
    pub fn slot(&self, id: i32) -> Option<&Slot> {
        self.available_slots.iter().find(|s| s.id == id)
    }

    /// Display name for `id`, falling back to a generic label.
    pub fn slot_name(&self, id: i32) -> String {
        self.slot(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("Preset {id}"))
    }

    /// Baud rate to open the transport at.
    ///
    /// Bluetooth SPP links always use [`DEFAULT_BLUETOOTH_BAUD_RATE`]; the
    /// per-model override only applies to USB serial.
    pub fn baud_rate_for(&self, kind: TransportKind) -> u32 {
        match kind {
            TransportKind::UsbSerial => self.baud_rate.unwrap_or(DEFAULT_USB_BAUD_RATE),
            TransportKind::BluetoothSpp => DEFAULT_BLUETOOTH_BAUD_RATE,
        }
    }
}

/// One named model of a vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub name: &'static str,
    pub usb_product_id: Option<u16>,
    pub config: ModelConfig,
}

/// Matching rules and models for one vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDescriptor {
    pub manufacturer: &'static str,
    pub protocol: WireProtocol,
    pub usb_vendor_id: Option<u16>,
    /// Accepted Bluetooth service-class UUIDs (any case).
    pub bluetooth_service_class_uuids: Vec<&'static str>,
    /// Models in declaration order.
    pub models: Vec<ModelEntry>,
}

impl DeviceDescriptor {
    fn match_usb(&self, vendor_id: u16, product_id: u16) -> Option<&ModelEntry> {
        if self.usb_vendor_id != Some(vendor_id) {
            return None;
        }
        self.models
            .iter()
            .find(|m| m.usb_product_id == Some(product_id))
    }

    fn match_bluetooth(&self, uuid: &str) -> Option<&ModelEntry> {
        let accepted = self
            .bluetooth_service_class_uuids
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(uuid));
        if !accepted {
            return None;
        }
        self.models
            .iter()
            .find(|m| m.usb_product_id.is_none())
            .or_else(|| self.models.first())
    }
}

/// The result of a successful descriptor match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceMatch {
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub protocol: WireProtocol,
    pub identity: DeviceIdentity,
    pub config: ModelConfig,
}

/// Find the descriptor and model matching `identity`.
///
/// Descriptors are tried in table order. For each one a USB match is
/// attempted first, then a Bluetooth match; the first hit wins.
pub fn match_device(table: &[DeviceDescriptor], identity: &DeviceIdentity) -> Result<DeviceMatch> {
    for descriptor in table {
        let model = match identity {
            DeviceIdentity::Usb {
                vendor_id,
                product_id,
            } => descriptor.match_usb(*vendor_id, *product_id),
            DeviceIdentity::Bluetooth { service_class_uuid } => {
                descriptor.match_bluetooth(service_class_uuid)
            }
        };
        if let Some(model) = model {
            return Ok(DeviceMatch {
                manufacturer: descriptor.manufacturer,
                model: model.name,
                protocol: descriptor.protocol,
                identity: identity.clone(),
                config: model.config.clone(),
            });
        }
    }
    Err(Error::UnsupportedDevice(identity.to_string()))
}

/// Filters handed to the host device picker so that unrelated devices are
/// hidden before this layer runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceFilters {
    /// Distinct USB vendor IDs, in table order.
    pub usb_vendor_ids: Vec<u16>,
    /// Distinct Bluetooth service-class UUIDs, in table order.
    pub bluetooth_service_class_ids: Vec<String>,
    /// Combined list of every UUID a Bluetooth-capable descriptor accepts.
    pub allowed_bluetooth_service_class_ids: Vec<String>,
}

impl DeviceFilters {
    pub fn allows_usb_vendor(&self, vendor_id: u16) -> bool {
        self.usb_vendor_ids.contains(&vendor_id)
    }

    pub fn allows_bluetooth_uuid(&self, uuid: &str) -> bool {
        self.allowed_bluetooth_service_class_ids
            .iter()
            .any(|u| u.eq_ignore_ascii_case(uuid))
    }
}

/// Build the picker filters from a descriptor table.
pub fn device_filters(table: &[DeviceDescriptor]) -> DeviceFilters {
    let mut filters = DeviceFilters::default();
    for descriptor in table {
        if let Some(vid) = descriptor.usb_vendor_id {
            if !filters.usb_vendor_ids.contains(&vid) {
                filters.usb_vendor_ids.push(vid);
            }
        }
        for uuid in &descriptor.bluetooth_service_class_uuids {
            let uuid = uuid.to_ascii_lowercase();
            if !filters.bluetooth_service_class_ids.contains(&uuid) {
                filters.bluetooth_service_class_ids.push(uuid.clone());
                filters.allowed_bluetooth_service_class_ids.push(uuid);
            }
        }
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    const BT_UUID: &str = "aeac4a03-dff5-498f-843a-34487cf133eb";

    fn usb_vendor(manufacturer: &'static str, vid: u16, pid: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            manufacturer,
            protocol: WireProtocol::JsonLine,
            usb_vendor_id: Some(vid),
            bluetooth_service_class_uuids: vec![],
            models: vec![ModelEntry {
                name: "Model A",
                usb_product_id: Some(pid),
                config: ModelConfig::default(),
            }],
        }
    }

    fn bt_vendor() -> DeviceDescriptor {
        DeviceDescriptor {
            manufacturer: "BT Vendor",
            protocol: WireProtocol::BinaryFrame,
            usb_vendor_id: None,
            bluetooth_service_class_uuids: vec![BT_UUID],
            models: vec![ModelEntry {
                name: "Headphone",
                usb_product_id: None,
                config: ModelConfig::default(),
            }],
        }
    }

    #[test]
    fn usb_match_by_vendor_and_product() {
        let table = vec![usb_vendor("V1", 0x152a, 0x88), bt_vendor()];
        let identity = DeviceIdentity::Usb {
            vendor_id: 0x152a,
            product_id: 0x88,
        };
        let m = match_device(&table, &identity).unwrap();
        assert_eq!(m.manufacturer, "V1");
        assert_eq!(m.model, "Model A");
        assert_eq!(m.protocol, WireProtocol::JsonLine);
    }

    #[test]
    fn usb_vendor_match_with_unknown_product_is_unsupported() {
        let table = vec![usb_vendor("V1", 0x152a, 0x88)];
        let identity = DeviceIdentity::Usb {
            vendor_id: 0x152a,
            product_id: 0x99,
        };
        match match_device(&table, &identity) {
            Err(Error::UnsupportedDevice(id)) => assert_eq!(id, "usb 0x152a:0x0099"),
            other => panic!("expected UnsupportedDevice, got {other:?}"),
        }
    }

    #[test]
    fn bluetooth_match_is_case_insensitive() {
        let table = vec![usb_vendor("V1", 0x152a, 0x88), bt_vendor()];
        let identity = DeviceIdentity::Bluetooth {
            service_class_uuid: BT_UUID.to_uppercase(),
        };
        let m = match_device(&table, &identity).unwrap();
        assert_eq!(m.manufacturer, "BT Vendor");
        assert_eq!(m.identity.transport_kind(), TransportKind::BluetoothSpp);
    }

    #[test]
    fn first_match_in_table_order_wins() {
        let table = vec![usb_vendor("First", 0x1000, 0x1), usb_vendor("Second", 0x1000, 0x1)];
        let identity = DeviceIdentity::Usb {
            vendor_id: 0x1000,
            product_id: 0x1,
        };
        assert_eq!(match_device(&table, &identity).unwrap().manufacturer, "First");
    }

    #[test]
    fn unknown_bluetooth_uuid_is_unsupported() {
        let table = vec![bt_vendor()];
        let identity = DeviceIdentity::Bluetooth {
            service_class_uuid: "00001101-0000-1000-8000-00805f9b34fb".into(),
        };
        match match_device(&table, &identity) {
            Err(Error::UnsupportedDevice(id)) => assert!(id.contains("00001101")),
            other => panic!("expected UnsupportedDevice, got {other:?}"),
        }
    }

    #[test]
    fn empty_table_is_unsupported() {
        let identity = DeviceIdentity::Usb {
            vendor_id: 1,
            product_id: 2,
        };
        assert!(matches!(
            match_device(&[], &identity),
            Err(Error::UnsupportedDevice(_))
        ));
    }

    #[test]
    fn writable_window() {
        let config = ModelConfig {
            first_writable_eq_slot: 5,
            max_writable_eq_slots: 2,
            ..Default::default()
        };
        assert!(!config.is_writable_slot(4));
        assert!(config.is_writable_slot(5));
        assert!(config.is_writable_slot(6));
        assert!(!config.is_writable_slot(7));
        assert_eq!(config.writable_slots(), vec![5, 6]);
    }

    #[test]
    fn ensure_writable_names_allowed_slots() {
        let config = ModelConfig {
            first_writable_eq_slot: 5,
            max_writable_eq_slots: 1,
            ..Default::default()
        };
        match config.ensure_writable("Headphone", 2) {
            Err(Error::Capability(msg)) => {
                assert!(msg.contains("slot 2"), "{msg}");
                assert!(msg.contains("[5]"), "{msg}");
            }
            other => panic!("expected Capability, got {other:?}"),
        }
        assert!(config.ensure_writable("Headphone", 5).is_ok());
    }

    #[test]
    fn baud_rate_resolution() {
        let config = ModelConfig {
            baud_rate: Some(57_600),
            ..Default::default()
        };
        assert_eq!(config.baud_rate_for(TransportKind::UsbSerial), 57_600);
        assert_eq!(config.baud_rate_for(TransportKind::BluetoothSpp), 9_600);
        let config = ModelConfig::default();
        assert_eq!(config.baud_rate_for(TransportKind::UsbSerial), 115_200);
    }

    #[test]
    fn slot_name_fallback() {
        let config = ModelConfig {
            available_slots: vec![Slot::new(2, "Voice")],
            ..Default::default()
        };
        assert_eq!(config.slot_name(2), "Voice");
        assert_eq!(config.slot_name(9), "Preset 9");
    }

    #[test]
    fn filters_are_union_of_table() {
        let table = vec![
            usb_vendor("V1", 0x152a, 0x88),
            usb_vendor("V2", 0x2972, 0x1),
            usb_vendor("V1 again", 0x152a, 0x89),
            bt_vendor(),
        ];
        let filters = device_filters(&table);
        assert_eq!(filters.usb_vendor_ids, vec![0x152a, 0x2972]);
        assert_eq!(filters.bluetooth_service_class_ids, vec![BT_UUID.to_string()]);
        assert!(filters.allows_bluetooth_uuid(&BT_UUID.to_uppercase()));
        assert!(filters.allows_usb_vendor(0x2972));
        assert!(!filters.allows_usb_vendor(0x0001));
    }
}
