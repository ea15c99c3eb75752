//! Transport trait for device communication.
//!
//! The [`Transport`] trait abstracts over the physical byte stream to a
//! device. Implementations exist for USB virtual COM ports and Bluetooth SPP
//! ports (both presented as serial ports by the OS) and for mock transports
//! used in tests.
//!
//! Protocol handlers never touch a `Transport` directly; they go through
//! [`ConnectedDevice`](crate::device::ConnectedDevice), which splits it into
//! a [`TransportReader`] and a [`TransportWriter`] so one read and one write
//! can be outstanding at the same time.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Implementations should not return until all bytes have been handed to
    /// the underlying port.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout` for
    /// data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing is received within the deadline. A zero `timeout` returns
    /// only data that is already buffered.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::TransportClosed`](crate::error::Error::TransportClosed).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently open.
    fn is_connected(&self) -> bool;

    /// Split into a read half and a write half that can be used
    /// concurrently.
    fn into_split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>);
}

/// Receiving half of a split [`Transport`].
#[async_trait]
pub trait TransportReader: Send + Sync {
    /// See [`Transport::receive`].
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Release the read side of the port.
    async fn close(&mut self) -> Result<()>;
}

/// Sending half of a split [`Transport`].
#[async_trait]
pub trait TransportWriter: Send + Sync {
    /// See [`Transport::send`].
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Flush and release the write side of the port.
    async fn close(&mut self) -> Result<()>;
}
