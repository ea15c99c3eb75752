//! The `PeqHandler` trait -- uniform contract for all vendor protocols.
//!
//! Each vendor crate (peqlib-jsonline, peqlib-binframe, peqlib-fiio) provides
//! a concrete handler implementing this trait. A handler instance is created
//! per [`ConnectedDevice`] and owns any per-session state (such as frame
//! counters), so sessions never share state.
//!
//! Handlers perform strictly sequential request/response exchanges: write a
//! command, then wait for the matching response. Nothing is pipelined and
//! nothing is retried.

use async_trait::async_trait;

use crate::device::ConnectedDevice;
use crate::error::Result;
use crate::types::{EqProfile, Filter, PushReport};

#[async_trait]
pub trait PeqHandler: Send + Sync {
    /// Query which slot/profile is currently active on the device.
    async fn get_current_slot(&self, device: &ConnectedDevice) -> Result<i32>;

    /// Read the current EQ configuration.
    ///
    /// Returns a basic profile (`is_basic_profile`, no filters) when the
    /// device only reports a named preset.
    async fn pull_from_device(&self, device: &ConnectedDevice, slot: i32) -> Result<EqProfile>;

    /// Write `filters` and `global_gain` to `slot`.
    ///
    /// Fails with [`Error::Capability`](crate::error::Error::Capability),
    /// without touching the transport, when `slot` is not writable. Band
    /// truncation and gain clamping are reported in the returned
    /// [`PushReport`].
    async fn push_to_device(
        &self,
        device: &ConnectedDevice,
        slot: i32,
        global_gain: f64,
        filters: &[Filter],
    ) -> Result<PushReport>;

    /// Toggle PEQ processing. Vendors without such a control succeed
    /// without doing anything.
    async fn enable_peq(&self, device: &ConnectedDevice, enabled: bool, slot: i32) -> Result<()>;
}
