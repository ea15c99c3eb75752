//! FiiO backend for peqlib.
//!
//! Provides the FiiO device descriptor ([`models`]) so FiiO devices are
//! recognised and matched, and a [`FiioHandler`] that validates requests but
//! reports [`Unsupported`](peqlib_core::Error::Unsupported) for every device
//! exchange until the FiiO framing is implemented.

pub mod handler;
pub mod models;

pub use handler::FiioHandler;
pub use models::fiio;
