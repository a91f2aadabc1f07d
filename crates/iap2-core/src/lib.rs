//! Session streams and the iAP2 link-engine state machine.
//!
//! This crate owns everything above the wire codec (`iap2-proto`) and below
//! the CSM application layer (`iap2-messages`): the pure `LinkEngine` state
//! machine, the `Environment` abstraction that lets it be tested without a
//! real clock, and the `SessionStream` byte-stream type the control and
//! external-accessory sessions are exposed through.

pub mod engine;
pub mod env;
pub mod error;
pub mod stream;

pub use engine::{LinkAction, LinkConfig, LinkEngine, LinkState, TimerKind, distance};
pub use env::{Environment, SystemEnvironment};
pub use error::{LinkError, StreamError};
pub use stream::SessionStream;
