//! Filter alignment.
//!
//! Devices with a fixed positional band layout expect exactly N bands in a
//! fixed type order. [`align`] maps a variable-length, unordered generic
//! filter list onto such a layout:
//!
//! ```text
//! [ low-shelf x L ][ peaking x P ][ high-shelf x H ]      N = L + P + H
//! ```
//!
//! Each type group keeps the caller's relative order, is truncated to its
//! limit (with a warning), and is padded with that type's disabled default.
//! The policy is the same for every vendor; only the [`BandLayout`] differs.
//!
//! Devices whose frames tag every band with its type need no fixed split.
//! Their [`BandLayout::capped`] layout only bounds the total: filters are
//! kept in caller order up to the cap, grouped by type, and the output is
//! padded with flat peaking bands up to the cap.

use crate::types::{Filter, FilterType};

/// Default frequency of a padding low-shelf band.
pub const DEFAULT_LOW_SHELF_FREQ: f64 = 80.0;
/// Default frequency of a padding peaking band.
pub const DEFAULT_PEAKING_FREQ: f64 = 1000.0;
/// Default frequency of a padding high-shelf band.
pub const DEFAULT_HIGH_SHELF_FREQ: f64 = 10_000.0;
/// Default Q of a padding band.
pub const DEFAULT_Q: f64 = 0.707;

/// Per-type band counts of a fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandLimits {
    pub low_shelf: usize,
    pub peaking: usize,
    pub high_shelf: usize,
}

impl BandLimits {
    pub fn total(&self) -> usize {
        self.low_shelf + self.peaking + self.high_shelf
    }

    pub fn for_type(&self, filter_type: FilterType) -> usize {
        match filter_type {
            FilterType::LowShelf => self.low_shelf,
            FilterType::Peaking => self.peaking,
            FilterType::HighShelf => self.high_shelf,
        }
    }
}

/// A vendor's band layout: limits plus the disabled default used to pad
/// each type group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLayout {
    pub limits: BandLimits,
    /// Total band count for layouts without a fixed per-type split.
    pub max_total: Option<usize>,
    pub low_shelf_default: Filter,
    pub peaking_default: Filter,
    pub high_shelf_default: Filter,
}

impl BandLayout {
    /// Layout with the standard flat defaults (0 dB, Q 0.707 at 80 Hz,
    /// 1 kHz and 10 kHz).
    pub fn standard(low_shelf: usize, peaking: usize, high_shelf: usize) -> Self {
        BandLayout {
            limits: BandLimits {
                low_shelf,
                peaking,
                high_shelf,
            },
            max_total: None,
            low_shelf_default: Filter::low_shelf(DEFAULT_LOW_SHELF_FREQ, 0.0, DEFAULT_Q),
            peaking_default: Filter::peaking(DEFAULT_PEAKING_FREQ, 0.0, DEFAULT_Q),
            high_shelf_default: Filter::high_shelf(DEFAULT_HIGH_SHELF_FREQ, 0.0, DEFAULT_Q),
        }
    }

    /// Layout of `max_filters` bands of any type mix.
    pub fn capped(max_filters: usize) -> Self {
        BandLayout {
            max_total: Some(max_filters),
            ..Self::standard(max_filters, max_filters, max_filters)
        }
    }

    /// Total number of bands N.
    pub fn band_count(&self) -> usize {
        match self.max_total {
            Some(cap) => cap.min(self.limits.total()),
            None => self.limits.total(),
        }
    }

    pub fn default_for(&self, filter_type: FilterType) -> Filter {
        match filter_type {
            FilterType::LowShelf => self.low_shelf_default,
            FilterType::Peaking => self.peaking_default,
            FilterType::HighShelf => self.high_shelf_default,
        }
    }

    /// Type expected at `position` in the aligned output. Capped layouts
    /// have no fixed positions and always return `None`.
    pub fn type_at(&self, position: usize) -> Option<FilterType> {
        if self.max_total.is_some() {
            return None;
        }
        let l = self.limits.low_shelf;
        let p = self.limits.peaking;
        if position < l {
            Some(FilterType::LowShelf)
        } else if position < l + p {
            Some(FilterType::Peaking)
        } else if position < self.band_count() {
            Some(FilterType::HighShelf)
        } else {
            None
        }
    }
}

/// Output of [`align`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Exactly [`BandLayout::band_count`] bands.
    pub bands: Vec<Filter>,
    pub warnings: Vec<String>,
}

const TYPE_ORDER: [FilterType; 3] = [
    FilterType::LowShelf,
    FilterType::Peaking,
    FilterType::HighShelf,
];

fn type_index(filter_type: FilterType) -> usize {
    match filter_type {
        FilterType::LowShelf => 0,
        FilterType::Peaking => 1,
        FilterType::HighShelf => 2,
    }
}

/// Map `filters` onto `layout`.
pub fn align(filters: &[Filter], layout: &BandLayout) -> Alignment {
    let cap = layout.band_count();
    let mut offered = [0usize; 3];
    let mut kept = [0usize; 3];
    let mut dropped = [0usize; 3];
    let mut over_cap = 0;
    let mut survivors = Vec::with_capacity(cap);

    for filter in filters {
        let i = type_index(filter.filter_type);
        offered[i] += 1;
        if survivors.len() >= cap {
            over_cap += 1;
            continue;
        }
        if kept[i] >= layout.limits.for_type(filter.filter_type) {
            dropped[i] += 1;
            continue;
        }
        kept[i] += 1;
        survivors.push(*filter);
    }

    let mut warnings = Vec::new();
    for filter_type in TYPE_ORDER {
        let i = type_index(filter_type);
        let limit = layout.limits.for_type(filter_type);
        if dropped[i] > 0 {
            warnings.push(format!(
                "{} {filter_type} filters exceed the device limit of {limit}; {} dropped",
                offered[i], dropped[i]
            ));
        }
    }
    if over_cap > 0 {
        warnings.push(format!(
            "{} filters exceed the device limit of {cap}; {over_cap} dropped",
            filters.len()
        ));
    }

    let mut bands = Vec::with_capacity(cap);
    for filter_type in TYPE_ORDER {
        bands.extend(survivors.iter().filter(|f| f.filter_type == filter_type));
        let padding = match layout.max_total {
            None => layout.limits.for_type(filter_type) - kept[type_index(filter_type)],
            Some(_) if filter_type == FilterType::Peaking => cap - survivors.len(),
            Some(_) => 0,
        };
        bands.extend(std::iter::repeat(layout.default_for(filter_type)).take(padding));
    }

    if !warnings.is_empty() {
        tracing::warn!(warnings = ?warnings, "Filter list truncated to fit band layout");
    }

    Alignment { bands, warnings }
}

/// Clamp every filter gain into `[min_gain, max_gain]`, returning one warning
/// per clamped filter.
pub fn clamp_gains(filters: &mut [Filter], min_gain: f64, max_gain: f64) -> Vec<String> {
    let mut warnings = Vec::new();
    for (index, filter) in filters.iter_mut().enumerate() {
        let clamped = filter.gain.clamp(min_gain, max_gain);
        if clamped != filter.gain {
            warnings.push(format!(
                "filter {} gain {:.1} dB clamped to {:.1} dB (device range {min_gain}..{max_gain} dB)",
                index + 1,
                filter.gain,
                clamped
            ));
            filter.gain = clamped;
        }
    }
    warnings
}
