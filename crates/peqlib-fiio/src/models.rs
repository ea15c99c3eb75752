//! FiiO device descriptors.
//!
//! FiiO dongles enumerate as USB devices under vendor ID `0x2972`. The
//! factory presets are read-only; user presets occupy a contiguous window.
//! All entries are marked experimental until the wire protocol is wired up.

use peqlib_core::align::BandLayout;
use peqlib_core::descriptor::{DeviceDescriptor, ModelConfig, ModelEntry, WireProtocol};
use peqlib_core::types::Slot;

/// USB vendor ID assigned to FiiO.
pub const FIIO_USB_VENDOR_ID: u16 = 0x2972;

pub const MANUFACTURER: &str = "FiiO";

/// Band layout used to validate pushes.
pub fn band_layout() -> BandLayout {
    BandLayout::standard(1, 8, 1)
}

fn presets() -> Vec<Slot> {
    vec![
        Slot::new(0, "Jazz"),
        Slot::new(1, "Pop"),
        Slot::new(2, "Rock"),
        Slot::new(3, "Dance"),
        Slot::new(4, "R&B"),
        Slot::new(5, "Classic"),
        Slot::new(6, "Hip-hop"),
        Slot::new(160, "USER1"),
        Slot::new(161, "USER2"),
        Slot::new(162, "USER3"),
    ]
}

pub fn ka17() -> ModelEntry {
    ModelEntry {
        name: "KA17",
        usb_product_id: Some(0x0101),
        config: ModelConfig {
            min_gain: -12.0,
            max_gain: 12.0,
            max_filters: 10,
            first_writable_eq_slot: 160,
            max_writable_eq_slots: 3,
            disconnect_on_save: false,
            disabled_preset_id: -1,
            experimental: true,
            available_slots: presets(),
            baud_rate: None,
        },
    }
}

/// The FiiO descriptor: USB only.
pub fn fiio() -> DeviceDescriptor {
    DeviceDescriptor {
        manufacturer: MANUFACTURER,
        protocol: WireProtocol::Fiio,
        usb_vendor_id: Some(FIIO_USB_VENDOR_ID),
        bluetooth_service_class_uuids: Vec::new(),
        models: vec![ka17()],
    }
}
