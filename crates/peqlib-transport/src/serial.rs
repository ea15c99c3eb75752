//! Serial port transport for device communication.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for USB virtual COM ports and Bluetooth SPP ports. Both appear to the
//! OS as ordinary serial devices:
//! - USB-serial DACs/amps: typically 115200 baud
//! - Bluetooth SPP (RFCOMM) links: nominal 9600 baud
//!
//! Every supported device uses 8 data bits, 1 stop bit, no parity and no
//! flow control, so only the baud rate is configurable.
//!
//! # Example
//!
//! ```no_run
//! use peqlib_transport::SerialTransport;
//! use peqlib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> peqlib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 115_200).await?;
//! transport.send(b"{\"Product\":\"JDS Labs Element IV\",\"Action\":\"Describe\"}\0").await?;
//!
//! let mut buf = [0u8; 1024];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use peqlib_core::error::{Error, Result};
use peqlib_core::transport::{Transport, TransportReader, TransportWriter};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

/// Serial port transport for USB-serial and Bluetooth SPP devices.
pub struct SerialTransport {
    reader: SerialReader,
    writer: SerialWriter,
}

/// Read half of a [`SerialTransport`].
pub struct SerialReader {
    half: Option<ReadHalf<SerialStream>>,
    port_name: String,
}

/// Write half of a [`SerialTransport`].
pub struct SerialWriter {
    half: Option<WriteHalf<SerialStream>>,
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate`, 8N1 without flow control.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        tracing::debug!(port = %port, baud_rate, "Opening serial port");

        let serial_stream = tokio_serial::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::TransportOpen(format!("{port}: {e}"))
            })?;

        tracing::info!(port = %port, baud_rate, "Serial port opened successfully");

        let (read_half, write_half) = tokio::io::split(serial_stream);
        Ok(Self {
            reader: SerialReader {
                half: Some(read_half),
                port_name: port.to_string(),
            },
            writer: SerialWriter {
                half: Some(write_half),
                port_name: port.to_string(),
            },
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.writer.port_name
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected {
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}

#[async_trait]
impl TransportWriter for SerialWriter {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.half.as_mut().ok_or(Error::TransportClosed)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?data,
            "Sending data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            map_io_error(e)
        })?;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.half.take() {
            tracing::debug!(port = %self.port_name, "Closing serial port");

            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }

            // The port closes once both halves are dropped.
            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }
}

#[async_trait]
impl TransportReader for SerialReader {
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.half.as_mut().ok_or(Error::TransportClosed)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(0)) => {
                tracing::warn!(port = %self.port_name, "Serial port returned end of stream");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = ?&buf[..n],
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.half = None;
        Ok(())
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.writer.send(data).await
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.reader.receive(buf, timeout).await
    }

    async fn close(&mut self) -> Result<()> {
        let flushed = self.writer.close().await;
        self.reader.close().await?;
        flushed
    }

    fn is_connected(&self) -> bool {
        self.writer.half.is_some()
    }

    fn into_split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>) {
        (Box::new(self.reader), Box::new(self.writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(map_io_error(broken), Error::ConnectionLost));
        let other = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad");
        assert!(matches!(map_io_error(other), Error::Io(_)));
    }

    #[tokio::test]
    async fn test_open_missing_port_fails_with_transport_open() {
        let result = SerialTransport::open("/dev/peqlib-does-not-exist", 115_200).await;
        match result {
            Err(Error::TransportOpen(msg)) => assert!(msg.contains("peqlib-does-not-exist")),
            Err(other) => panic!("expected TransportOpen, got {other:?}"),
            Ok(_) => panic!("expected failure"),
        }
    }
}
