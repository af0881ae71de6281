//! Unified error type for snl660-light.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.
//!
//! Severity follows the component lifecycle:
//! - [`ConfigError`] is fatal at setup for the light component only.
//! - [`WriteError`] is transient and retried on the next tick.
//! - [`InputRangeError`] is clamped and logged, never fatal.
//!
//! Only startup and link bring-up failures travel as [`Error`]; write and
//! range errors stay inside the driver.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Invalid or incomplete configuration, detected before the driver runs.
    Config(ConfigError),

    /// The BLE link could not be brought up.
    Ble(BleError),

    // Storage
    /// Flash read/write/erase failed.
    Storage,
}

/// Configuration problems caught at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `ble_client_id` was left empty.
    MissingBleClientId,
    /// `ble_client_id` does not name any declared BLE client.
    UnknownBleClient,
    /// `output_id` was given but is empty.
    InvalidOutputId,
    /// The driver was activated before `set_ble_client` was called.
    BleClientNotBound,
}

/// Subset of BLE link errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Scan was cancelled or could not start.
    ScanFailed,
    /// Scan finished without seeing a fixture.
    FixtureNotFound,
    /// Connection attempt failed.
    ConnectFailed,
    /// Neither SNL660 service layout was found during GATT discovery.
    ServiceNotFound,
}

/// Why a write request did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    /// The link is not connected (or the control characteristic is not ready).
    NotConnected,
    /// The link already has a request queued.
    Busy,
    /// The connection dropped before or during the write.
    Disconnected,
    /// The stack rejected the write (GATT or SoftDevice error).
    Rejected,
}

/// Which part of a desired state had to be clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputRangeError {
    /// Brightness outside `[0.0, 1.0]` or not a number.
    Brightness,
    /// Colour temperature outside the fixture's mired range.
    ColorTemperature,
}

// Convenience conversions

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {e:?}"),
            Error::Ble(e) => write!(f, "BLE error: {e:?}"),
            Error::Storage => f.write_str("storage error"),
        }
    }
}
