//! FiiO [`PeqHandler`] implementation.
//!
//! The FiiO framing is not implemented. The handler still honours the
//! shared contract: pushes are validated against the model's writable
//! window and band layout exactly like the other vendors before failing
//! with [`Error::Unsupported`], so callers see capability errors first.

use async_trait::async_trait;
use tracing::{debug, warn};

use peqlib_core::align::{BandLayout, align, clamp_gains};
use peqlib_core::device::ConnectedDevice;
use peqlib_core::error::{Error, Result};
use peqlib_core::handler::PeqHandler;
use peqlib_core::types::{EqProfile, Filter, PushReport};

use crate::models;

fn unsupported(operation: &str) -> Error {
    Error::Unsupported(format!("FiiO {operation}: wire protocol not available"))
}

#[derive(Debug, Clone)]
pub struct FiioHandler {
    layout: BandLayout,
}

impl FiioHandler {
    pub fn new() -> Self {
        FiioHandler {
            layout: models::band_layout(),
        }
    }
}

impl Default for FiioHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeqHandler for FiioHandler {
    async fn get_current_slot(&self, _device: &ConnectedDevice) -> Result<i32> {
        Err(unsupported("getCurrentSlot"))
    }

    async fn pull_from_device(&self, _device: &ConnectedDevice, _slot: i32) -> Result<EqProfile> {
        Err(unsupported("pullFromDevice"))
    }

    async fn push_to_device(
        &self,
        device: &ConnectedDevice,
        slot: i32,
        _global_gain: f64,
        filters: &[Filter],
    ) -> Result<PushReport> {
        let config = device.config();
        config.ensure_writable(device.model(), slot)?;

        let mut filters = filters.to_vec();
        let mut warnings = clamp_gains(&mut filters, config.min_gain, config.max_gain);
        let aligned = align(&filters, &self.layout);
        warnings.extend(aligned.warnings);

        debug!(
            port = device.port(),
            slot,
            bands = aligned.bands.len(),
            warnings = warnings.len(),
            "FiiO push validated"
        );
        warn!(port = device.port(), model = device.model(), "FiiO EQ writes are not implemented");
        Err(unsupported("pushToDevice"))
    }

    async fn enable_peq(&self, _device: &ConnectedDevice, _enabled: bool, _slot: i32) -> Result<()> {
        Err(unsupported("enablePEQ"))
    }
}
