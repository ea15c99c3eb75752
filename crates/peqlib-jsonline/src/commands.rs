//! Describe/update command builders and response parsers.
//!
//! The device exposes its DSP state as a nested `Configuration` object. Each
//! writable value appears as `{"Current": value, ...}` in a describe
//! response and as a bare value in an update request.

use peqlib_core::align::BandLayout;
use peqlib_core::error::{Error, Result};
use peqlib_core::types::{Filter, FilterType};
use serde_json::{Map, Value, json};

/// Band entry names in positional order: 2 low-shelf, 8 peaking, 2 high-shelf.
pub const BAND_NAMES: [&str; 12] = [
    "Lowshelf 1",
    "Lowshelf 2",
    "Peaking 1",
    "Peaking 2",
    "Peaking 3",
    "Peaking 4",
    "Peaking 5",
    "Peaking 6",
    "Peaking 7",
    "Peaking 8",
    "Highshelf 1",
    "Highshelf 2",
];

/// Input mode value that selects slot 0.
pub const USB_INPUT_MODE: &str = "USB";

/// The fixed band layout matching [`BAND_NAMES`].
pub fn band_layout() -> BandLayout {
    BandLayout::standard(2, 8, 2)
}

/// Wire name of a filter type.
pub fn wire_type(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::Peaking => "PEAKING",
        FilterType::LowShelf => "LOWSHELF",
        FilterType::HighShelf => "HIGHSHELF",
    }
}

/// Parse a wire filter type name.
pub fn parse_wire_type(name: &str) -> Option<FilterType> {
    match name {
        "PEAKING" => Some(FilterType::Peaking),
        "LOWSHELF" => Some(FilterType::LowShelf),
        "HIGHSHELF" => Some(FilterType::HighShelf),
        _ => None,
    }
}

/// `{"Product": <product>, "Action": "Describe"}`
pub fn describe_request(product: &str) -> Value {
    json!({
        "Product": product,
        "Action": "Describe",
    })
}

/// Build an update request writing `bands` and the preamp gain.
///
/// `bands` must already be aligned to [`band_layout`]; extra bands are
/// ignored.
pub fn update_request(product: &str, global_gain: f64, bands: &[Filter]) -> Value {
    let mut headphone = Map::new();
    for (name, band) in BAND_NAMES.iter().zip(bands) {
        headphone.insert(
            (*name).to_string(),
            json!({
                "Gain": band.gain,
                "Frequency": band.freq,
                "Q": band.q,
                "Type": wire_type(band.filter_type),
            }),
        );
    }
    headphone.insert(
        "Preamp".to_string(),
        json!({
            "Gain": global_gain,
            "Mode": "AUTO",
        }),
    );

    json!({
        "Product": product,
        "FormatOutput": true,
        "Action": "Update",
        "Configuration": {
            "DSP": {
                "Headphone": Value::Object(headphone),
            },
        },
    })
}

/// Slot selected by the input mode: `"USB"` is 0, anything else is 1.
pub fn parse_input_mode(response: &Value) -> Result<i32> {
    let mode = response
        .pointer("/Configuration/General/Input Mode/Current")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::Protocol("describe response has no Configuration.General.Input Mode".into())
        })?;
    Ok(if mode == USB_INPUT_MODE { 0 } else { 1 })
}

/// Bands and preamp gain read from a describe response.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadphoneEq {
    /// Exactly [`BAND_NAMES`]`.len()` bands, in positional order.
    pub bands: Vec<Filter>,
    pub preamp_gain: f64,
    /// Names of bands the device did not report.
    pub missing: Vec<&'static str>,
}

impl HeadphoneEq {
    /// Capability warning for missing bands, if any.
    pub fn missing_warning(&self) -> Option<String> {
        if self.missing.is_empty() {
            return None;
        }
        Some(format!(
            "{} of {} bands missing from device response ({}); defaults substituted, \
             firmware likely supports fewer bands",
            self.missing.len(),
            BAND_NAMES.len(),
            self.missing.join(", ")
        ))
    }
}

fn current_f64(band: &Value, band_name: &str, field: &str) -> Result<f64> {
    band.get(field)
        .and_then(|v| v.get("Current"))
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::Protocol(format!("band {band_name} has no numeric {field}.Current")))
}

/// Read `Configuration.DSP.Headphone` out of a describe response.
pub fn parse_headphone_eq(response: &Value) -> Result<HeadphoneEq> {
    let headphone = response
        .pointer("/Configuration/DSP/Headphone")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::Protocol("describe response has no Configuration.DSP.Headphone".into())
        })?;

    let layout = band_layout();
    let mut bands = Vec::with_capacity(BAND_NAMES.len());
    let mut missing = Vec::new();

    for (position, name) in BAND_NAMES.iter().enumerate() {
        let slot_type = layout.type_at(position).unwrap_or(FilterType::Peaking);
        let Some(band) = headphone.get(*name) else {
            missing.push(*name);
            bands.push(layout.default_for(slot_type));
            continue;
        };

        let filter_type = band
            .pointer("/Type/Current")
            .and_then(Value::as_str)
            .and_then(parse_wire_type)
            .unwrap_or(slot_type);
        bands.push(Filter::new(
            filter_type,
            current_f64(band, name, "Frequency")?,
            current_f64(band, name, "Gain")?,
            current_f64(band, name, "Q")?,
        ));
    }

    let preamp_gain = headphone
        .get("Preamp")
        .and_then(|p| p.pointer("/Gain/Current"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    Ok(HeadphoneEq {
        bands,
        preamp_gain,
        missing,
    })
}

/// Succeeds iff the response carries `"Status": true`.
pub fn check_status(response: &Value) -> Result<()> {
    match response.get("Status") {
        Some(Value::Bool(true)) => Ok(()),
        Some(other) => Err(Error::Protocol(format!("device rejected update: Status {other}"))),
        None => Err(Error::Protocol("update response has no Status".into())),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A describe response with the given input mode and band entries.
    pub(crate) fn describe_response(input_mode: &str, band_names: &[&str]) -> Value {
        let mut headphone = Map::new();
        for (i, name) in band_names.iter().enumerate() {
            let filter_type = if name.starts_with("Lowshelf") {
                "LOWSHELF"
            } else if name.starts_with("Highshelf") {
                "HIGHSHELF"
            } else {
                "PEAKING"
            };
            let freq = 100.0 * (i + 1) as f64;
            headphone.insert(
                (*name).to_string(),
                json!({
                    "Type": {"Current": filter_type},
                    "Frequency": {"Current": freq},
                    "Gain": {"Current": -1.5},
                    "Q": {"Current": 1.2},
                }),
            );
        }
        headphone.insert("Preamp".into(), json!({"Gain": {"Current": -3.0}}));
        json!({
            "Configuration": {
                "General": {"Input Mode": {"Current": input_mode}},
                "DSP": {"Headphone": Value::Object(headphone)},
            }
        })
    }

    #[test]
    fn describe_request_shape() {
        assert_eq!(
            describe_request("JDS Labs Element IV"),
            json!({"Product": "JDS Labs Element IV", "Action": "Describe"})
        );
    }

    #[test]
    fn input_mode_maps_usb_to_zero() {
        assert_eq!(parse_input_mode(&describe_response("USB", &[])).unwrap(), 0);
        assert_eq!(parse_input_mode(&describe_response("SPDIF", &[])).unwrap(), 1);
        assert!(matches!(
            parse_input_mode(&json!({"Configuration": {}})),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn full_band_set_parses_in_order() {
        let eq = parse_headphone_eq(&describe_response("USB", &BAND_NAMES)).unwrap();
        assert_eq!(eq.bands.len(), 12);
        assert!(eq.missing.is_empty());
        assert_eq!(eq.missing_warning(), None);
        assert_eq!(eq.bands[0].filter_type, FilterType::LowShelf);
        assert_eq!(eq.bands[2].filter_type, FilterType::Peaking);
        assert_eq!(eq.bands[11].filter_type, FilterType::HighShelf);
        assert_eq!(eq.bands[3].freq, 400.0);
        assert_eq!(eq.preamp_gain, -3.0);
    }

    #[test]
    fn missing_bands_take_defaults_and_warn() {
        let present = &BAND_NAMES[..10];
        let eq = parse_headphone_eq(&describe_response("USB", present)).unwrap();
        assert_eq!(eq.missing, vec!["Highshelf 1", "Highshelf 2"]);
        assert_eq!(eq.bands[10], Filter::high_shelf(10_000.0, 0.0, 0.707));
        let warning = eq.missing_warning().unwrap();
        assert!(warning.starts_with("2 of 12 bands missing"));
    }

    #[test]
    fn band_without_frequency_is_protocol_error() {
        let response = json!({
            "Configuration": {"DSP": {"Headphone": {
                "Lowshelf 1": {"Gain": {"Current": 1.0}, "Q": {"Current": 0.7}}
            }}}
        });
        assert!(matches!(parse_headphone_eq(&response), Err(Error::Protocol(_))));
    }

    #[test]
    fn update_request_mirrors_describe_schema() {
        let layout = band_layout();
        let aligned: Vec<Filter> = (0..layout.band_count())
            .filter_map(|i| layout.type_at(i))
            .map(|t| layout.default_for(t))
            .collect();
        let request = update_request("JDS Labs Element IV", -2.0, &aligned);

        assert_eq!(request["Action"], "Update");
        assert_eq!(request["FormatOutput"], true);
        let headphone = &request["Configuration"]["DSP"]["Headphone"];
        assert_eq!(headphone.as_object().unwrap().len(), 13);
        assert_eq!(headphone["Peaking 1"]["Frequency"], 1000.0);
        assert_eq!(headphone["Lowshelf 2"]["Type"], "LOWSHELF");
        assert_eq!(headphone["Preamp"], json!({"Gain": -2.0, "Mode": "AUTO"}));
    }

    #[test]
    fn status_must_be_true() {
        assert!(check_status(&json!({"Status": true})).is_ok());
        assert!(matches!(check_status(&json!({"Status": false})), Err(Error::Protocol(_))));
        assert!(matches!(check_status(&json!({})), Err(Error::Protocol(_))));
    }
}
