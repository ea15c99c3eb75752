//! JSON-line [`PeqHandler`] implementation.

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use peqlib_core::align::{BandLayout, align, clamp_gains};
use peqlib_core::device::ConnectedDevice;
use peqlib_core::error::{Error, Result};
use peqlib_core::handler::PeqHandler;
use peqlib_core::types::{EqProfile, Filter, PushReport};

use crate::commands;
use crate::models::product_name;
use crate::protocol::{self, DecodeResult};

/// Handler for devices speaking NUL-delimited JSON.
///
/// Stateless apart from the band layout; one instance is still created per
/// connected device.
#[derive(Debug, Clone)]
pub struct JsonLineHandler {
    layout: BandLayout,
}

impl JsonLineHandler {
    pub fn new() -> Self {
        JsonLineHandler {
            layout: commands::band_layout(),
        }
    }

    /// Send one request and wait for the NUL-terminated response.
    ///
    /// Input left over from an earlier exchange is discarded before the
    /// request is sent. Bytes that arrive after the first terminator are
    /// dropped.
    async fn exchange(&self, device: &ConnectedDevice, request: &Value) -> Result<Value> {
        let bytes = protocol::encode_request(request)?;
        debug!(
            port = device.port(),
            action = request.get("Action").and_then(serde_json::Value::as_str),
            bytes = bytes.len(),
            "Sending JSON request"
        );
        device.discard_input().await?;
        device.write(&bytes).await?;

        let deadline = Instant::now() + device.response_timeout();
        let mut buf = [0u8; 1024];
        let mut response = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            let n = device.read(&mut buf, remaining).await?;
            response.extend_from_slice(&buf[..n]);

            match protocol::decode_response(&response) {
                DecodeResult::Response { value, consumed } => {
                    if consumed < response.len() {
                        debug!(
                            port = device.port(),
                            discarded = response.len() - consumed,
                            "Discarding bytes after response terminator"
                        );
                    }
                    return Ok(value);
                }
                DecodeResult::Malformed { reason, .. } => return Err(Error::Protocol(reason)),
                DecodeResult::Incomplete => {}
            }
        }
    }

    async fn describe(&self, device: &ConnectedDevice) -> Result<Value> {
        let product = product_name(device.manufacturer(), device.model());
        self.exchange(device, &commands::describe_request(&product))
            .await
    }
}

impl Default for JsonLineHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeqHandler for JsonLineHandler {
    async fn get_current_slot(&self, device: &ConnectedDevice) -> Result<i32> {
        let response = self.describe(device).await?;
        commands::parse_input_mode(&response)
    }

    async fn pull_from_device(&self, device: &ConnectedDevice, slot: i32) -> Result<EqProfile> {
        let response = self.describe(device).await?;
        let eq = commands::parse_headphone_eq(&response)?;

        let mut warnings = Vec::new();
        if let Some(warning) = eq.missing_warning() {
            warn!(
                port = device.port(),
                model = device.model(),
                missing = eq.missing.len(),
                "{warning}"
            );
            warnings.push(warning);
        }

        Ok(EqProfile {
            filters: eq.bands,
            global_gain: eq.preamp_gain,
            slot_id: slot,
            slot_name: device.config().slot_name(slot),
            is_basic_profile: false,
            warnings,
        })
    }

    async fn push_to_device(
        &self,
        device: &ConnectedDevice,
        slot: i32,
        global_gain: f64,
        filters: &[Filter],
    ) -> Result<PushReport> {
        let config = device.config();
        config.ensure_writable(device.model(), slot)?;

        let mut filters = filters.to_vec();
        let mut warnings = clamp_gains(&mut filters, config.min_gain, config.max_gain);
        let aligned = align(&filters, &self.layout);
        warnings.extend(aligned.warnings);

        let product = product_name(device.manufacturer(), device.model());
        let request = commands::update_request(&product, global_gain, &aligned.bands);
        let response = self.exchange(device, &request).await?;
        commands::check_status(&response)?;

        debug!(port = device.port(), slot, warnings = warnings.len(), "EQ update accepted");
        Ok(PushReport {
            warnings,
            disconnected: false,
        })
    }

    async fn enable_peq(&self, device: &ConnectedDevice, enabled: bool, slot: i32) -> Result<()> {
        debug!(port = device.port(), enabled, slot, "PEQ toggle not supported; ignoring");
        Ok(())
    }
}
