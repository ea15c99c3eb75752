//! Descriptor for the binary-frame vendor.
//!
//! Devices are reached over Bluetooth SPP and identified only by service
//! class UUID. Factory presets are read-only; the single "Custom" profile is
//! the only writable slot and the only one whose bands can be read back.

use peqlib_core::align::BandLayout;
use peqlib_core::descriptor::{DeviceDescriptor, ModelConfig, ModelEntry, WireProtocol};
use peqlib_core::types::Slot;

pub const MANUFACTURER: &str = "Nothing";

/// SPP service class advertised by the headphones.
pub const SERVICE_CLASS_UUID: &str = "aeac4a03-dff5-498f-843a-34487cf133eb";

/// Profile id of the writable custom EQ.
pub const CUSTOM_PROFILE_ID: i32 = 5;

/// Bands in the custom EQ.
pub const MAX_BANDS: u32 = 8;

/// Band layout written by the custom EQ command. Every band carries its own
/// type byte, so any mix of types fits up to [`MAX_BANDS`].
pub fn band_layout() -> BandLayout {
    BandLayout::capped(MAX_BANDS as usize)
}

pub fn headphone_1() -> ModelEntry {
    ModelEntry {
        name: "Headphone (1)",
        usb_product_id: None,
        config: ModelConfig {
            min_gain: -6.0,
            max_gain: 6.0,
            max_filters: MAX_BANDS,
            first_writable_eq_slot: CUSTOM_PROFILE_ID,
            max_writable_eq_slots: 1,
            disconnect_on_save: false,
            disabled_preset_id: -1,
            experimental: false,
            available_slots: vec![
                Slot::new(0, "Balanced"),
                Slot::new(1, "Voice"),
                Slot::new(2, "More Treble"),
                Slot::new(3, "More Bass"),
                Slot::new(CUSTOM_PROFILE_ID, "Custom"),
            ],
            baud_rate: None,
        },
    }
}

/// The binary-frame vendor descriptor: Bluetooth only.
pub fn nothing() -> DeviceDescriptor {
    DeviceDescriptor {
        manufacturer: MANUFACTURER,
        protocol: WireProtocol::BinaryFrame,
        usb_vendor_id: None,
        bluetooth_service_class_uuids: vec![SERVICE_CLASS_UUID],
        models: vec![headphone_1()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_custom_profile_is_writable() {
        let config = headphone_1().config;
        assert_eq!(config.writable_slots(), vec![CUSTOM_PROFILE_ID]);
        assert_eq!(config.slot_name(2), "More Treble");
        assert_eq!(config.max_filters as usize, band_layout().band_count());
    }
}
