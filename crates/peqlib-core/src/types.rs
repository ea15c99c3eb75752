//! Core types used throughout peqlib.
//!
//! These types are the vendor-agnostic vocabulary shared between the
//! surrounding application and every vendor protocol handler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a single parametric filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    #[serde(alias = "PK", alias = "PEAKING")]
    Peaking,
    #[serde(alias = "LSQ", alias = "LS", alias = "LOWSHELF")]
    LowShelf,
    #[serde(alias = "HSQ", alias = "HS", alias = "HIGHSHELF")]
    HighShelf,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterType::Peaking => "Peaking",
            FilterType::LowShelf => "LowShelf",
            FilterType::HighShelf => "HighShelf",
        };
        write!(f, "{s}")
    }
}

/// One vendor-agnostic parametric filter.
///
/// A generic filter list carries no ordering guarantee; each vendor handler
/// imposes its own positional layout during alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Centre (peaking) or corner (shelf) frequency in hertz.
    pub freq: f64,
    /// Gain in dB.
    pub gain: f64,
    pub q: f64,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl Filter {
    pub fn new(filter_type: FilterType, freq: f64, gain: f64, q: f64) -> Self {
        Filter {
            freq,
            gain,
            q,
            filter_type,
        }
    }

    pub fn peaking(freq: f64, gain: f64, q: f64) -> Self {
        Self::new(FilterType::Peaking, freq, gain, q)
    }

    pub fn low_shelf(freq: f64, gain: f64, q: f64) -> Self {
        Self::new(FilterType::LowShelf, freq, gain, q)
    }

    pub fn high_shelf(freq: f64, gain: f64, q: f64) -> Self {
        Self::new(FilterType::HighShelf, freq, gain, q)
    }
}

/// A device-resident storage location for one EQ configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: i32,
    pub name: String,
}

impl Slot {
    pub fn new(id: i32, name: &str) -> Self {
        Slot {
            id,
            name: name.to_string(),
        }
    }
}

/// The EQ configuration read back from a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EqProfile {
    /// Parametric bands. Empty when [`is_basic_profile`](Self::is_basic_profile)
    /// is set.
    pub filters: Vec<Filter>,
    /// Global gain / preamp in dB.
    pub global_gain: f64,
    pub slot_id: i32,
    pub slot_name: String,
    /// The device reported a named preset without exposing its bands.
    pub is_basic_profile: bool,
    /// Capability warnings raised while reading (e.g. missing bands).
    pub warnings: Vec<String>,
}

impl EqProfile {
    /// A named preset with no parametric data.
    pub fn basic(slot: &Slot) -> Self {
        EqProfile {
            filters: Vec::new(),
            global_gain: 0.0,
            slot_id: slot.id,
            slot_name: slot.name.clone(),
            is_basic_profile: true,
            warnings: Vec::new(),
        }
    }
}

/// Outcome of a successful push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    /// Band truncation and gain clamping warnings. The write still happened.
    pub warnings: Vec<String>,
    /// The session closed the device after saving (models with
    /// `disconnect_on_save`).
    pub disconnected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_deserializes_from_upload_json() {
        let json = r#"[
            {"freq": 105.0, "gain": 4.5, "q": 0.7, "type": "LSQ"},
            {"freq": 2000.0, "gain": -3.0, "q": 1.41, "type": "PK"},
            {"freq": 9000.0, "gain": 2.0, "q": 0.7, "type": "HighShelf"}
        ]"#;
        let filters: Vec<Filter> = serde_json::from_str(json).unwrap();
        assert_eq!(filters[0].filter_type, FilterType::LowShelf);
        assert_eq!(filters[1].filter_type, FilterType::Peaking);
        assert_eq!(filters[2].filter_type, FilterType::HighShelf);
        assert_eq!(filters[1].q, 1.41);
    }

    #[test]
    fn filter_serializes_type_field() {
        let json = serde_json::to_string(&Filter::peaking(1000.0, 0.0, 0.707)).unwrap();
        assert!(json.contains(r#""type":"Peaking""#), "{json}");
    }

    #[test]
    fn basic_profile_has_no_filters() {
        let profile = EqProfile::basic(&Slot::new(2, "Voice"));
        assert!(profile.is_basic_profile);
        assert!(profile.filters.is_empty());
        assert_eq!(profile.slot_name, "Voice");
    }

    #[test]
    fn filter_type_display() {
        assert_eq!(FilterType::LowShelf.to_string(), "LowShelf");
    }
}
