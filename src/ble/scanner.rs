//! BLE GAP scanner - finds an SNL660 when no address is configured.
//!
//! Uses the SoftDevice Central-role scanning API. Advertisements are
//! filtered by the SNL660 service UUID; the strongest one seen within the
//! scan window wins.

use crate::ble::adv_parser::{contains_snl660_service_uuid, extract_device_name};
use crate::config::BLE_SCAN_DURATION_SECS;
use crate::error::BleError;
use crate::storage::FixtureRecord;
use embassy_time::{Duration, Instant};
use nrf_softdevice::ble::{central, Address, AddressType};
use nrf_softdevice::Softdevice;

/// A fixture seen while scanning.
#[derive(Clone)]
pub struct DiscoveredFixture {
    pub address: Address,
    pub name: heapless::String<32>,
    /// Received Signal Strength Indicator (dBm).
    pub rssi: i8,
}

impl DiscoveredFixture {
    pub fn record(&self) -> FixtureRecord {
        FixtureRecord::new(
            self.address.bytes(),
            address_type_code(self.address.address_type()),
            self.name.as_str(),
        )
    }
}

/// Address type as stored in a `FixtureRecord`.
pub fn address_type_code(t: AddressType) -> u8 {
    match t {
        AddressType::Public => 0,
        AddressType::RandomStatic => 1,
        AddressType::RandomPrivateResolvable => 2,
        AddressType::RandomPrivateNonResolvable => 3,
        AddressType::Anonymous => 4,
    }
}

/// Rebuild a SoftDevice address from a `FixtureRecord`.
pub fn record_address(record: &FixtureRecord) -> Address {
    let address_type = match record.address_type {
        0 => AddressType::Public,
        2 => AddressType::RandomPrivateResolvable,
        3 => AddressType::RandomPrivateNonResolvable,
        4 => AddressType::Anonymous,
        _ => AddressType::RandomStatic,
    };
    Address::new(address_type, record.address)
}

/// Scan for `BLE_SCAN_DURATION_SECS` seconds and return the strongest fixture.
pub async fn scan(sd: &Softdevice) -> Result<DiscoveredFixture, BleError> {
    info!("BLE scan starting ({} s window)", BLE_SCAN_DURATION_SECS);

    let config = central::ScanConfig {
        // Active scan to retrieve scan-response data (names, UUID lists).
        active: true,
        ..Default::default()
    };

    let deadline = Instant::now() + Duration::from_secs(BLE_SCAN_DURATION_SECS);
    let mut best: Option<DiscoveredFixture> = None;

    let scan_result = central::scan(sd, &config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };

        if Instant::now() > deadline {
            return Some(()); // Signal scan to stop
        }

        if contains_snl660_service_uuid(data) {
            let stronger = best.as_ref().map_or(true, |b| params.rssi > b.rssi);
            if stronger {
                let fixture = DiscoveredFixture {
                    address: Address::from_raw(params.peer_addr),
                    name: extract_device_name(data),
                    rssi: params.rssi,
                };
                debug!("Found: {} (RSSI {})", fixture.name.as_str(), fixture.rssi);
                best = Some(fixture);
            }
        }

        // Return None to keep scanning, Some(()) to stop.
        None
    })
    .await;

    if scan_result.is_err() {
        warn!("BLE scan ended with error");
        return Err(BleError::ScanFailed);
    }

    match best {
        Some(fixture) => {
            info!("BLE scan complete - using {} (RSSI {})", fixture.name.as_str(), fixture.rssi);
            Ok(fixture)
        }
        None => {
            info!("BLE scan complete - no fixture found");
            Err(BleError::FixtureNotFound)
        }
    }
}
