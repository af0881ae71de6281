//! SNL660 light bridge for nRF52840.
//!
//! The library holds everything that is plain logic (driver state machine,
//! packet encoding, configuration, advertisement parsing, button mapping)
//! and builds on the host for `cargo test --lib`. Everything that needs
//! Embassy or the SoftDevice sits behind the `embedded` feature and is
//! wired together by `main.rs`.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

pub mod ble;
pub mod config;
pub mod error;
pub mod light;
pub mod storage;
pub mod ui;

pub use error::Error;
pub use light::{DesiredState, DriverState, LightDriver, LightTraits};
