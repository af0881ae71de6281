//! Application-wide constants and compile-time configuration.
//!
//! Timing parameters, connection parameters and flash layout
//! live here so they can be tuned in one place. The light
//! instance and the BLE client it talks to are declared as typed
//! configuration and validated once at startup.

use crate::error::{ConfigError, Error};

// BLE

/// Duration of a BLE scan window when looking for a fixture (seconds).
pub const BLE_SCAN_DURATION_SECS: u64 = 10;

/// BLE connection interval range (in 1.25 ms units).
/// 24..40 = 30..50 ms, plenty for a handful of light commands.
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Delay before the link task tries to reconnect after a drop or failure (ms).
pub const BLE_RECONNECT_DELAY_MS: u64 = 2_000;

/// How often an idle link re-checks that the connection is still up (ms).
pub const BLE_LINK_SUPERVISION_MS: u64 = 500;

// Light driver

/// Scheduler tick for the light driver (ms).
pub const TICK_INTERVAL_MS: u64 = 50;

/// Brightness change per button press (fraction of full scale).
pub const BRIGHTNESS_STEP: f32 = 0.1;

/// Log a warning on the first failure and then every N consecutive failures.
pub const WRITE_FAILURE_LOG_EVERY: u32 = 20;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button POWER   → P0.11
//   Button UP      → P0.12
//   Button DOWN    → P0.24

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

/// Hold time before UP/DOWN start repeating (ms).
pub const BUTTON_REPEAT_DELAY_MS: u64 = 400;

/// Repeat period of a held UP/DOWN button (ms).
pub const BUTTON_REPEAT_MS: u64 = 150;

// Fixture storage

/// Flash page index where fixture storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for fixture storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

// Instance configuration

/// Identifier given to a light whose `output_id` is not set.
pub const DEFAULT_OUTPUT_ID: &str = "snl660_light";

/// A BLE client declaration: one remote peripheral the firmware connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BleClientConfig<'a> {
    pub id: &'a str,
    /// Public address of the fixture, most significant byte first as printed
    /// on the label. `None` means: scan for it and remember what was found.
    pub address: Option<[u8; 6]>,
}

/// Configuration of one SNL660 light output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightConfig<'a> {
    pub output_id: Option<&'a str>,
    pub ble_client_id: &'a str,
}

/// A light configuration whose references have been checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLight<'a> {
    pub output_id: &'a str,
    pub client: BleClientConfig<'a>,
}

impl<'a> LightConfig<'a> {
    /// Validate this light against the declared BLE clients.
    ///
    /// Invalid configuration is rejected here, before any driver exists.
    pub fn resolve(&self, clients: &[BleClientConfig<'a>]) -> Result<ResolvedLight<'a>, ConfigError> {
        let output_id = match self.output_id {
            Some("") => return Err(ConfigError::InvalidOutputId),
            Some(id) => id,
            None => DEFAULT_OUTPUT_ID,
        };

        if self.ble_client_id.is_empty() {
            return Err(ConfigError::MissingBleClientId);
        }

        let client = clients
            .iter()
            .find(|c| c.id == self.ble_client_id)
            .copied()
            .ok_or(ConfigError::UnknownBleClient)?;

        Ok(ResolvedLight { output_id, client })
    }
}

/// BLE clients declared for this firmware.
pub const BLE_CLIENTS: &[BleClientConfig<'static>] = &[BleClientConfig {
    id: "snl660_ble",
    address: None,
}];

/// The light output driven by this firmware.
pub const LIGHT: LightConfig<'static> = LightConfig {
    output_id: Some("studio_panel"),
    ble_client_id: "snl660_ble",
};

/// Resolve [`LIGHT`] against [`BLE_CLIENTS`].
pub fn shipped_light() -> Result<ResolvedLight<'static>, Error> {
    Ok(LIGHT.resolve(BLE_CLIENTS)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENTS: &[BleClientConfig<'static>] = &[
        BleClientConfig {
            id: "desk",
            address: Some([0xC4, 0x9F, 0x11, 0x22, 0x33, 0x44]),
        },
        BleClientConfig {
            id: "shelf",
            address: None,
        },
    ];

    #[test]
    fn shipped_configuration_is_valid() {
        let light = shipped_light().unwrap();
        assert_eq!(light.output_id, "studio_panel");
        assert_eq!(light.client, BLE_CLIENTS[0]);
    }

    #[test]
    fn config_failures_surface_as_top_level_errors() {
        let light = LightConfig {
            output_id: Some(""),
            ble_client_id: "desk",
        };
        let e: Error = light.resolve(CLIENTS).unwrap_err().into();
        assert_eq!(e, Error::Config(ConfigError::InvalidOutputId));
    }

    #[test]
    fn resolves_existing_client() {
        let light = LightConfig {
            output_id: Some("key_light"),
            ble_client_id: "shelf",
        };
        let resolved = light.resolve(CLIENTS).unwrap();
        assert_eq!(resolved.output_id, "key_light");
        assert_eq!(resolved.client, CLIENTS[1]);
    }

    #[test]
    fn generates_output_id_when_absent() {
        let light = LightConfig {
            output_id: None,
            ble_client_id: "desk",
        };
        assert_eq!(light.resolve(CLIENTS).unwrap().output_id, DEFAULT_OUTPUT_ID);
    }

    #[test]
    fn rejects_unknown_client() {
        let light = LightConfig {
            output_id: None,
            ble_client_id: "kitchen",
        };
        assert_eq!(light.resolve(CLIENTS), Err(ConfigError::UnknownBleClient));
    }

    #[test]
    fn rejects_missing_client_id() {
        let light = LightConfig {
            output_id: None,
            ble_client_id: "",
        };
        assert_eq!(light.resolve(CLIENTS), Err(ConfigError::MissingBleClientId));
    }

    #[test]
    fn rejects_empty_output_id() {
        let light = LightConfig {
            output_id: Some(""),
            ble_client_id: "desk",
        };
        assert_eq!(light.resolve(CLIENTS), Err(ConfigError::InvalidOutputId));
    }
}
