//! The built-in device table.
//!
//! Order is priority: when an identity could match more than one entry, the
//! earlier one wins.

use peqlib_core::descriptor::{DeviceDescriptor, DeviceFilters, device_filters};

/// Every supported vendor, in matching priority order.
pub fn device_table() -> Vec<DeviceDescriptor> {
    vec![
        peqlib_jsonline::jds_labs(),
        peqlib_fiio::fiio(),
        peqlib_binframe::nothing(),
    ]
}

/// Picker filters for the built-in table.
pub fn picker_filters() -> DeviceFilters {
    device_filters(&device_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peqlib_core::descriptor::{DeviceIdentity, WireProtocol, match_device};
    use peqlib_core::Error;

    #[test]
    fn table_order_is_jds_fiio_nothing() {
        let names: Vec<_> = device_table().iter().map(|d| d.manufacturer).collect();
        assert_eq!(names, vec!["JDS Labs", "FiiO", "Nothing"]);
    }

    #[test]
    fn filters_cover_every_vendor() {
        let filters = picker_filters();
        assert_eq!(filters.usb_vendor_ids, vec![0x152a, 0x2972]);
        assert_eq!(
            filters.allowed_bluetooth_service_class_ids,
            vec![peqlib_binframe::models::SERVICE_CLASS_UUID.to_string()]
        );
    }

    #[test]
    fn identities_resolve_to_protocols() {
        let table = device_table();
        let jds = match_device(
            &table,
            &DeviceIdentity::Usb {
                vendor_id: 0x152a,
                product_id: 0x0088,
            },
        )
        .unwrap();
        assert_eq!(jds.protocol, WireProtocol::JsonLine);

        let nothing = match_device(
            &table,
            &DeviceIdentity::Bluetooth {
                service_class_uuid: "AEAC4A03-DFF5-498F-843A-34487CF133EB".into(),
            },
        )
        .unwrap();
        assert_eq!(nothing.protocol, WireProtocol::BinaryFrame);
        assert_eq!(nothing.model, "Headphone (1)");
    }

    #[test]
    fn unknown_product_of_known_vendor_is_unsupported() {
        let result = match_device(
            &device_table(),
            &DeviceIdentity::Usb {
                vendor_id: 0x2972,
                product_id: 0xFFFF,
            },
        );
        assert!(matches!(result, Err(Error::UnsupportedDevice(_))));
    }
}
