//! JDS Labs device descriptor.
//!
//! | Model      | USB PID | Bands (LS/PK/HS) | Writable slots     |
//! |------------|---------|------------------|--------------------|
//! | Element IV | 0x0088  | 2 / 8 / 2        | 0 (USB), 1 (SPDIF) |
//!
//! The "slot" of a JDS Labs device is its input mode: the EQ follows the
//! selected input.

use peqlib_core::descriptor::{DeviceDescriptor, ModelConfig, ModelEntry, WireProtocol};
use peqlib_core::types::Slot;

/// USB vendor ID assigned to JDS Labs.
pub const JDS_LABS_USB_VENDOR_ID: u16 = 0x152a;

pub const MANUFACTURER: &str = "JDS Labs";

/// Element IV DAC/amp.
pub fn element_iv() -> ModelEntry {
    ModelEntry {
        name: "Element IV",
        usb_product_id: Some(0x0088),
        config: ModelConfig {
            min_gain: -12.0,
            max_gain: 12.0,
            max_filters: 12,
            first_writable_eq_slot: 0,
            max_writable_eq_slots: 2,
            disconnect_on_save: false,
            disabled_preset_id: -1,
            experimental: false,
            available_slots: vec![Slot::new(0, "USB"), Slot::new(1, "SPDIF")],
            baud_rate: None,
        },
    }
}

/// The JDS Labs descriptor: USB only.
pub fn jds_labs() -> DeviceDescriptor {
    DeviceDescriptor {
        manufacturer: MANUFACTURER,
        protocol: WireProtocol::JsonLine,
        usb_vendor_id: Some(JDS_LABS_USB_VENDOR_ID),
        bluetooth_service_class_uuids: Vec::new(),
        models: vec![element_iv()],
    }
}

/// Product string sent in every request.
pub fn product_name(manufacturer: &str, model: &str) -> String {
    format!("{manufacturer} {model}")
}
