//! Error types for peqlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Connector-level, transport-level,
//! protocol-level, and capability errors are all captured here.
//!
//! Band-limit overflow and gain clamping are *not* errors: they are reported
//! as warnings alongside an otherwise successful result.

use std::fmt;

/// The error type for all peqlib operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The observed device identity matched no descriptor in the table.
    ///
    /// Carries the identity (`vid:pid` in hex, or the Bluetooth UUID) for
    /// diagnostic display.
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    /// The device picker returned no device.
    #[error("no device selected")]
    NoDeviceSelected,

    /// The transport could not be opened (permission denied, port busy).
    #[error("failed to open transport: {0}")]
    TransportOpen(String),

    /// A malformed or unexpected response (missing JSON keys, undersized
    /// binary payload, wrong status).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The requested write violates the device's capabilities, e.g. the
    /// target slot is not writable.
    #[error("capability error: {0}")]
    Capability(String),

    /// Timed out waiting for a response from the device.
    #[error("timeout waiting for response")]
    Timeout,

    /// The transport was closed, either before the operation started or
    /// while it was in flight.
    #[error("transport closed")]
    TransportClosed,

    /// The connection to the device was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A session operation was requested with no connected device.
    #[error("no active device")]
    NoActiveDevice,

    /// An invalid parameter was passed by the caller.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation is not available for this vendor.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error raised while performing an operation on a specific device.
    #[error("{context}: {source}")]
    Operation {
        context: OperationContext,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the device and operation it occurred in.
    pub fn in_operation(self, context: OperationContext) -> Self {
        Error::Operation {
            context,
            source: Box::new(self),
        }
    }

    /// Return the innermost error, looking through [`Error::Operation`]
    /// wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error leaves the device session unusable.
    ///
    /// The session manager evicts and closes the device when a call fails
    /// with one of these.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self.root(),
            Error::TransportClosed | Error::ConnectionLost | Error::Io(_)
        )
    }
}

/// Where an error happened: enough to render an actionable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    pub manufacturer: String,
    pub model: String,
    pub operation: &'static str,
    pub slot: Option<i32>,
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.manufacturer, self.model, self.operation)?;
        if let Some(slot) = self.slot {
            write!(f, " (slot {slot})")?;
        }
        Ok(())
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
