//! Accessory-side transport plumbing for the iAP2 link.
//!
//! This crate is the "production glue" layer: it wraps `iap2-core`'s
//! action-based [`iap2_core::LinkEngine`] with real I/O (a framed byte
//! transport, `tokio` timers, and an authentication coprocessor) behind an
//! [`iap2_app::Driver`] implementation, so [`iap2_app::Runtime`] can drive
//! the handshake and steady-state exchange without knowing whether it is
//! talking to real hardware or the in-memory transport used here for tests
//! and the demo binary.
//!
//! # Components
//!
//! - [`transport::ByteTransport`] / [`transport::MemoryTransport`]: the
//!   transport seam and its only in-repo implementation.
//! - [`io::FrameIo`]: buffers and frames a transport against the link wire
//!   format, including byte-shift re-synchronisation on a bad header.
//! - [`coprocessor::ChallengeCoprocessor`] / [`coprocessor::DemoCoprocessor`]:
//!   the authentication coprocessor seam.
//! - [`driver::AccessoryDriver`]: ties the above together as an
//!   [`iap2_app::Driver`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod coprocessor;
pub mod driver;
pub mod error;
pub mod io;
pub mod transport;

pub use coprocessor::{ChallengeCoprocessor, DemoCoprocessor};
pub use driver::AccessoryDriver;
pub use error::AccessoryError;
pub use io::{FrameIo, Input};
pub use transport::{ByteTransport, MemoryTransport};
