//! # peqlib -- parametric EQ control for USB and Bluetooth audio devices
//!
//! `peqlib` discovers DACs, amps and headphones that expose a parametric
//! equalizer over a USB virtual COM port or a Bluetooth SPP link, matches
//! them against a table of supported vendors, and reads or writes their
//! filter sets through one vendor-agnostic interface.
//!
//! ## Quick Start
//!
//! ```no_run
//! use peqlib::{Filter, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> peqlib::Result<()> {
//!     let session = SessionBuilder::new().build();
//!     let device = session.get_device_connected().await?;
//!     println!("{} {}", device.device().manufacturer(), device.device().model());
//!
//!     let report = session
//!         .push_to_device(0, -3.0, &[Filter::peaking(3000.0, -2.5, 1.4)])
//!         .await?;
//!     for warning in report.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     session.disconnect_device().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                 | Purpose                                                 |
//! |-----------------------|---------------------------------------------------------|
//! | `peqlib-core`         | Types, errors, descriptors, alignment, [`PeqHandler`]   |
//! | `peqlib-transport`    | Serial transport, port picker and opener                |
//! | `peqlib-jsonline`     | NUL-delimited JSON protocol (JDS Labs)                  |
//! | `peqlib-binframe`     | CRC16 binary frame protocol (Nothing)                   |
//! | `peqlib-fiio`         | FiiO descriptors; wire protocol not implemented         |
//! | **`peqlib`**          | This facade: device table, dispatch, connector, session |
//!
//! ## Supported Devices
//!
//! - **JDS Labs**: Element IV (USB)
//! - **FiiO**: KA17 (USB, recognised only)
//! - **Nothing**: Headphone (1) (Bluetooth SPP)

pub use peqlib_core::*;

/// NUL-delimited JSON protocol backend.
pub mod jsonline {
    pub use peqlib_jsonline::*;
}

/// CRC16 binary frame protocol backend.
pub mod binframe {
    pub use peqlib_binframe::*;
}

/// FiiO backend.
pub mod fiio {
    pub use peqlib_fiio::*;
}

pub mod builder;
pub mod connector;
pub mod descriptors;
pub mod session;
pub mod vendor;

pub use builder::SessionBuilder;
pub use connector::Connector;
pub use descriptors::{device_table, picker_filters};
pub use session::{BoundDevice, DEFAULT_OPERATION_TIMEOUT, SessionManager};
pub use vendor::VendorHandler;
