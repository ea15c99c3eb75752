//! Binary-frame [`PeqHandler`] implementation.
//!
//! Every call is one or two strict request/response exchanges. The handler
//! owns the session's operation-id counter, so it must be created per
//! connected device.

use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use peqlib_core::align::{BandLayout, align, clamp_gains};
use peqlib_core::descriptor::ModelConfig;
use peqlib_core::device::ConnectedDevice;
use peqlib_core::error::{Error, Result};
use peqlib_core::handler::PeqHandler;
use peqlib_core::types::{EqProfile, Filter, PushReport, Slot};

use crate::commands::{
    CMD_READ_EQ_MODE, CMD_READ_EQ_VALUES, CMD_READ_FIRMWARE, CMD_SET_ADVANCED_CUSTOM_EQ,
    RESP_EQ_MODE, RESP_EQ_VALUES, RESP_FIRMWARE, encode_eq_payload, parse_eq_mode, parse_eq_values,
    parse_firmware,
};
use crate::frame::{DecodeResult, Frame, decode_frame, encode_frame};
use crate::models;

/// Handler for devices speaking CRC16-framed binary commands.
#[derive(Debug)]
pub struct BinaryFrameHandler {
    layout: BandLayout,
    operation_id: AtomicU8,
}

impl BinaryFrameHandler {
    pub fn new() -> Self {
        Self::with_layout(models::band_layout())
    }

    pub fn with_layout(layout: BandLayout) -> Self {
        BinaryFrameHandler {
            layout,
            operation_id: AtomicU8::new(0),
        }
    }

    /// Next operation id. The first frame of a session carries 1; the
    /// counter wraps at 255.
    fn next_operation_id(&self) -> u8 {
        self.operation_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Send one command and wait for a response frame.
    ///
    /// Input left over from an earlier exchange is discarded first. With
    /// `expect` set, frames carrying any other command code are skipped.
    /// Without it, the first frame received is returned.
    async fn request(
        &self,
        device: &ConnectedDevice,
        command: u16,
        payload: &[u8],
        expect: Option<u16>,
    ) -> Result<Frame> {
        let operation_id = self.next_operation_id();
        let bytes = encode_frame(command, payload, operation_id)?;
        debug!(
            port = device.port(),
            command = format_args!("{command:#06X}"),
            operation_id,
            bytes = bytes.len(),
            "Sending frame"
        );
        device.discard_input().await?;
        device.write(&bytes).await?;

        let deadline = Instant::now() + device.response_timeout();
        let mut buf = [0u8; 512];
        let mut pending = Vec::new();

        loop {
            loop {
                match decode_frame(&pending) {
                    DecodeResult::Frame { frame, consumed } => {
                        pending.drain(..consumed);
                        if !frame.crc_valid {
                            warn!(
                                port = device.port(),
                                command = format_args!("{:#06X}", frame.command),
                                operation_id = frame.operation_id,
                                "CRC mismatch in response frame; processing anyway"
                            );
                        }
                        if expect.map_or(true, |code| code == frame.command) {
                            debug!(
                                port = device.port(),
                                command = format_args!("{:#06X}", frame.command),
                                operation_id = frame.operation_id,
                                payload_len = frame.payload.len(),
                                "Received frame"
                            );
                            return Ok(frame);
                        }
                        debug!(
                            port = device.port(),
                            command = format_args!("{:#06X}", frame.command),
                            "Skipping unrelated frame"
                        );
                    }
                    DecodeResult::Garbage(n) => {
                        trace!(port = device.port(), bytes = n, "Dropping bytes outside a frame");
                        pending.drain(..n);
                    }
                    DecodeResult::Incomplete => break,
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            let n = device.read(&mut buf, remaining).await?;
            pending.extend_from_slice(&buf[..n]);
        }
    }

    /// Query the firmware version string.
    pub async fn read_firmware(&self, device: &ConnectedDevice) -> Result<String> {
        let frame = self
            .request(device, CMD_READ_FIRMWARE, &[], Some(RESP_FIRMWARE))
            .await?;
        Ok(parse_firmware(&frame.payload))
    }
}

impl Default for BinaryFrameHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Profile index byte of the writable custom profile.
fn custom_profile_index(config: &ModelConfig) -> Result<u8> {
    u8::try_from(config.first_writable_eq_slot).map_err(|_| {
        Error::InvalidParameter(format!(
            "custom profile id {} does not fit a profile index",
            config.first_writable_eq_slot
        ))
    })
}

#[async_trait]
impl PeqHandler for BinaryFrameHandler {
    async fn get_current_slot(&self, device: &ConnectedDevice) -> Result<i32> {
        let frame = self
            .request(device, CMD_READ_EQ_MODE, &[], Some(RESP_EQ_MODE))
            .await?;
        parse_eq_mode(&frame.payload)
    }

    async fn pull_from_device(&self, device: &ConnectedDevice, slot: i32) -> Result<EqProfile> {
        let active = self.get_current_slot(device).await?;
        let config = device.config();
        if active != slot {
            debug!(port = device.port(), requested = slot, active, "Reading the active profile");
        }

        if active != config.first_writable_eq_slot {
            let name = config.slot_name(active);
            debug!(port = device.port(), active, name = %name, "Active profile is a preset");
            return Ok(EqProfile::basic(&Slot { id: active, name }));
        }

        let frame = self
            .request(device, CMD_READ_EQ_VALUES, &[], Some(RESP_EQ_VALUES))
            .await?;
        let values = parse_eq_values(&frame.payload)?;

        Ok(EqProfile {
            filters: values.bands,
            global_gain: values.total_gain,
            slot_id: active,
            slot_name: config.slot_name(active),
            is_basic_profile: false,
            warnings: Vec::new(),
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
        let profile_index = custom_profile_index(config)?;

        let mut filters = filters.to_vec();
        let mut warnings = clamp_gains(&mut filters, config.min_gain, config.max_gain);
        let aligned = align(&filters, &self.layout);
        warnings.extend(aligned.warnings);

        let payload = encode_eq_payload(profile_index, global_gain, &aligned.bands)?;
        let ack = self
            .request(device, CMD_SET_ADVANCED_CUSTOM_EQ, &payload, None)
            .await?;
        debug!(
            port = device.port(),
            slot,
            operation_id = ack.operation_id,
            "Custom EQ acknowledged"
        );

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
