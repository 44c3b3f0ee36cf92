#![cfg_attr(docsrs, feature(doc_cfg))]
//! # bmsbridge_lib
//!
//! Translation layer between a battery management system and a CAN connected
//! inverter. A normalized [`snapshot::BatterySnapshot`] is gated by the
//! [`safety::SafetyGate`], encoded into the vendor frame layout and handed to a
//! [`transport::TransportSink`], either when the inverter polls or on a timer.
//!
//! ## Features
//!
//! - `default`: Enables `bin-dependencies`, which is intended for compiling the `bmsbridge` command-line tool.
//!
//! The library itself only depends on `log`, `serde`, `thiserror` and `heapless`;
//! encoding and dispatch never allocate.

/// Contains error types for the library.
mod error;

pub mod config;
pub mod dispatcher;
pub mod encoder;
pub mod profile;
/// Wire level types and constants of the inverter protocol.
pub mod protocol;
pub mod safety;
pub mod snapshot;
pub mod transport;

pub use config::BridgeConfig;
pub use dispatcher::{Dispatcher, TransmitMode};
pub use error::Error;
