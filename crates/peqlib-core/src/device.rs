//! The connected device handle.
//!
//! A [`ConnectedDevice`] exclusively owns an open [`Transport`] together with
//! the descriptor match that produced it. The transport is split into a
//! read half and a write half, each behind its own lock. Handlers talk to
//! the device only through [`write`](ConnectedDevice::write) and
//! [`read`](ConnectedDevice::read); each call holds its half's lock for that
//! single operation, so a stalled read never blocks a write.
//!
//! [`disconnect`](ConnectedDevice::disconnect) is the only cancellation
//! primitive: it trips a cancellation token that every in-flight read and
//! write races against, so they fail with [`Error::TransportClosed`] instead
//! of hanging, and then closes both halves.

use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::descriptor::{DeviceIdentity, DeviceMatch, ModelConfig, WireProtocol};
use crate::error::{Error, OperationContext, Result};
use crate::transport::{Transport, TransportReader, TransportWriter};

/// Default time to wait for a single device response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound on reads spent discarding stale input before a request.
const MAX_DISCARD_READS: usize = 64;

/// An open, matched device.
pub struct ConnectedDevice {
    info: DeviceMatch,
    port: String,
    reader: Mutex<Box<dyn TransportReader>>,
    writer: Mutex<Box<dyn TransportWriter>>,
    closed: CancellationToken,
    response_timeout: Duration,
}

impl ConnectedDevice {
    pub fn new(
        info: DeviceMatch,
        port: &str,
        transport: Box<dyn Transport>,
        response_timeout: Duration,
    ) -> Self {
        let (reader, writer) = transport.into_split();
        ConnectedDevice {
            info,
            port: port.to_string(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: CancellationToken::new(),
            response_timeout,
        }
    }

    pub fn manufacturer(&self) -> &'static str {
        self.info.manufacturer
    }

    pub fn model(&self) -> &'static str {
        self.info.model
    }

    pub fn protocol(&self) -> WireProtocol {
        self.info.protocol
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.info.identity
    }

    pub fn config(&self) -> &ModelConfig {
        &self.info.config
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// How long a handler waits for one response frame.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// `false` once [`disconnect`](Self::disconnect) has been called.
    pub fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Build an error context for an operation on this device.
    pub fn context(&self, operation: &'static str, slot: Option<i32>) -> OperationContext {
        OperationContext {
            manufacturer: self.info.manufacturer.to_string(),
            model: self.info.model.to_string(),
            operation,
            slot,
        }
    }

    /// Write one complete request.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::TransportClosed);
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(Error::TransportClosed),
            result = async {
                let mut writer = self.writer.lock().await;
                writer.send(data).await
            } => result,
        }
    }

    /// Read whatever the device has sent, waiting up to `timeout`.
    pub async fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if self.closed.is_cancelled() {
            return Err(Error::TransportClosed);
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(Error::TransportClosed),
            result = async {
                let mut reader = self.reader.lock().await;
                reader.receive(buf, timeout).await
            } => result,
        }
    }

    /// Drop input that is already buffered, such as a late reply to a
    /// request that timed out. Returns the number of bytes discarded.
    pub async fn discard_input(&self) -> Result<usize> {
        let mut buf = [0u8; 256];
        let mut discarded = 0;
        for _ in 0..MAX_DISCARD_READS {
            match self.read(&mut buf, Duration::ZERO).await {
                Ok(n) => discarded += n,
                Err(Error::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        if discarded > 0 {
            debug!(port = %self.port, bytes = discarded, "Discarded stale input");
        }
        Ok(discarded)
    }

    /// Cancel in-flight I/O and close the transport.
    ///
    /// Close failures are logged, not returned: the device may already be
    /// physically gone.
    pub async fn disconnect(&self) {
        if self.closed.is_cancelled() {
            debug!(port = %self.port, "Device already disconnected");
            return;
        }
        self.closed.cancel();

        let closed_writer = self.writer.lock().await.close().await;
        let closed_reader = self.reader.lock().await.close().await;
        if let Err(e) = closed_writer.and(closed_reader) {
            warn!(
                port = %self.port,
                manufacturer = self.info.manufacturer,
                model = self.info.model,
                error = %e,
                "Failed to close transport (continuing anyway)"
            );
        }
        info!(
            port = %self.port,
            manufacturer = self.info.manufacturer,
            model = self.info.model,
            "Device disconnected"
        );
    }
}

impl fmt::Debug for ConnectedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedDevice")
            .field("manufacturer", &self.info.manufacturer)
            .field("model", &self.info.model)
            .field("protocol", &self.info.protocol)
            .field("identity", &self.info.identity)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    /// Echoes every write back on the next read; optionally never answers.
    #[derive(Clone)]
    struct Loopback {
        pending: Arc<StdMutex<Vec<u8>>>,
        silent: bool,
        closed: Arc<AtomicBool>,
    }

    impl Loopback {
        fn new(silent: bool) -> Self {
            Loopback {
                pending: Arc::default(),
                silent,
                closed: Arc::default(),
            }
        }

        fn push(&self, data: &[u8]) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::TransportClosed);
            }
            if let Ok(mut pending) = self.pending.lock() {
                pending.extend_from_slice(data);
            }
            Ok(())
        }

        async fn pull(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::TransportClosed);
            }
            let taken = match self.pending.lock() {
                Ok(mut pending) if !self.silent && !pending.is_empty() => {
                    let n = pending.len().min(buf.len());
                    buf[..n].copy_from_slice(&pending[..n]);
                    pending.drain(..n);
                    Some(n)
                }
                _ => None,
            };
            match taken {
                Some(n) => Ok(n),
                None => {
                    tokio::time::sleep(timeout).await;
                    Err(Error::Timeout)
                }
            }
        }

        fn shut(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl Transport for Loopback {
        async fn send(&mut self, data: &[u8]) -> Result<()> {
            self.push(data)
        }

        async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            self.pull(buf, timeout).await
        }

        async fn close(&mut self) -> Result<()> {
            self.shut()
        }

        fn is_connected(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }

        fn into_split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>) {
            (Box::new((*self).clone()), self)
        }
    }

    #[async_trait]
    impl TransportReader for Loopback {
        async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            self.pull(buf, timeout).await
        }

        async fn close(&mut self) -> Result<()> {
            self.shut()
        }
    }

    #[async_trait]
    impl TransportWriter for Loopback {
        async fn send(&mut self, data: &[u8]) -> Result<()> {
            self.push(data)
        }

        async fn close(&mut self) -> Result<()> {
            self.shut()
        }
    }

    fn info() -> DeviceMatch {
        DeviceMatch {
            manufacturer: "Test",
            model: "Loopback",
            protocol: WireProtocol::JsonLine,
            identity: DeviceIdentity::Usb {
                vendor_id: 1,
                product_id: 2,
            },
            config: ModelConfig::default(),
        }
    }

    fn device(transport: &Loopback) -> ConnectedDevice {
        ConnectedDevice::new(
            info(),
            "loop0",
            Box::new(transport.clone()),
            DEFAULT_RESPONSE_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let device = device(&Loopback::new(false));

        device.write(b"hello").await.unwrap();
        let mut buf = [0u8; 16];
        let n = device.read(&mut buf, Duration::from_millis(50)).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[tokio::test]
    async fn write_completes_while_read_is_pending() {
        let device = Arc::new(device(&Loopback::new(true)));

        let reader = {
            let device = device.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4];
                device.read(&mut buf, Duration::from_secs(2)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_millis(300), device.write(b"x"))
            .await
            .expect("write must not wait for the pending read")
            .unwrap();

        device.disconnect().await;
        let result = reader.await.unwrap();
        assert!(matches!(result, Err(Error::TransportClosed)));
    }

    #[tokio::test]
    async fn discard_input_drops_buffered_bytes() {
        let transport = Loopback::new(false);
        let device = device(&transport);

        device.write(b"late reply").await.unwrap();
        assert_eq!(device.discard_input().await.unwrap(), 10);
        assert_eq!(device.discard_input().await.unwrap(), 0);

        let mut buf = [0u8; 16];
        let result = device.read(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn operations_after_disconnect_fail_closed() {
        let transport = Loopback::new(false);
        let device = device(&transport);

        device.disconnect().await;
        assert!(!device.is_connected());
        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(matches!(device.write(b"x").await, Err(Error::TransportClosed)));
        let mut buf = [0u8; 4];
        assert!(matches!(
            device.read(&mut buf, Duration::from_millis(10)).await,
            Err(Error::TransportClosed)
        ));
        assert!(matches!(device.discard_input().await, Err(Error::TransportClosed)));
    }

    #[tokio::test]
    async fn disconnect_cancels_in_flight_read() {
        let transport = Loopback::new(true);
        let device = Arc::new(device(&transport));

        let reader = {
            let device = device.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4];
                device.read(&mut buf, Duration::from_secs(30)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::timeout(Duration::from_secs(1), device.disconnect())
            .await
            .expect("disconnect must not wait for the stalled read");

        let result = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("read must finish after disconnect")
            .unwrap();
        assert!(matches!(result, Err(Error::TransportClosed)));
        assert!(transport.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let device = device(&Loopback::new(false));
        device.disconnect().await;
        device.disconnect().await;
        assert!(!device.is_connected());
    }

    #[test]
    fn context_names_device() {
        let device = device(&Loopback::new(false));
        let ctx = device.context("pullFromDevice", Some(1));
        assert_eq!(ctx.to_string(), "Test Loopback pullFromDevice (slot 1)");
    }
}
