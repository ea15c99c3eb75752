//! SessionBuilder -- fluent builder for constructing a [`SessionManager`].
//!
//! # Example
//!
//! ```no_run
//! use peqlib::SessionBuilder;
//! use peqlib_transport::SerialPortPicker;
//! use std::time::Duration;
//!
//! # async fn example() -> peqlib::Result<()> {
//! let session = SessionBuilder::new()
//!     .picker(SerialPortPicker::new().bluetooth_port(
//!         "/dev/rfcomm0",
//!         "aeac4a03-dff5-498f-843a-34487cf133eb",
//!     ))
//!     .response_timeout(Duration::from_secs(2))
//!     .build();
//!
//! session.get_device_connected().await?;
//! let profile = session.pull_from_device(5).await?;
//! println!("{} bands in {}", profile.filters.len(), profile.slot_name);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use peqlib_core::descriptor::DeviceDescriptor;
use peqlib_core::device::DEFAULT_RESPONSE_TIMEOUT;
use peqlib_core::discovery::{DevicePicker, TransportOpener};
use peqlib_transport::{SerialOpener, SerialPortPicker};

use crate::connector::Connector;
use crate::descriptors::device_table;
use crate::session::{DEFAULT_OPERATION_TIMEOUT, SessionManager};

/// Fluent builder for [`SessionManager`].
///
/// Defaults: the built-in device table, the serial-port picker and opener,
/// a 3 s response timeout and a 5 s operation timeout.
pub struct SessionBuilder {
    table: Vec<DeviceDescriptor>,
    picker: Arc<dyn DevicePicker>,
    opener: Arc<dyn TransportOpener>,
    response_timeout: Duration,
    operation_timeout: Duration,
}

impl SessionBuilder {
    pub fn new() -> Self {
        SessionBuilder {
            table: device_table(),
            picker: Arc::new(SerialPortPicker::new()),
            opener: Arc::new(SerialOpener),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Replace the device table. Order is matching priority.
    pub fn device_table(mut self, table: Vec<DeviceDescriptor>) -> Self {
        self.table = table;
        self
    }

    pub fn picker(mut self, picker: impl DevicePicker + 'static) -> Self {
        self.picker = Arc::new(picker);
        self
    }

    pub fn opener(mut self, opener: impl TransportOpener + 'static) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    /// How long a handler waits for each response (default: 3 s).
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Bound on a whole session operation (default: 5 s).
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn build(self) -> SessionManager {
        let connector = Connector::new(
            self.table,
            self.picker,
            self.opener,
            self.response_timeout,
        );
        SessionManager::new(connector, self.operation_timeout)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
