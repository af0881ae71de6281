//! BLE GATT client for the SNL660 control service.
//!
//! After GAP connection is established, this module:
//! 1. Discovers the SNL660 service (`69400001-...`), falling back to the
//!    byte-swapped UUID some firmware revisions expose.
//! 2. Locates the control characteristic (`69400002-...`).
//! 3. Writes the packets of a `WriteRequest`, in order, without response.

use crate::ble::WriteRequest;
use crate::error::{BleError, WriteError};
use nrf_softdevice::ble::{gatt_client, Connection};

/// nrf-softdevice GATT client struct for the SNL660 service.
///
/// The `#[nrf_softdevice::gatt_client]` macro generates discovery and
/// write helpers for the listed characteristic.
#[nrf_softdevice::gatt_client(uuid = "69400001-b5a3-f393-e0a9-e50e24dcca99")]
pub struct Snl660Client {
    /// Control packets: `[0x78, cmd, 0x01, value, checksum]`.
    #[characteristic(uuid = "69400002-b5a3-f393-e0a9-e50e24dcca99", write, write_without_response)]
    pub control: [u8; 5],
}

/// Same service with the UUID bytes in reverse order.
#[nrf_softdevice::gatt_client(uuid = "99cadc24-0ee5-a9e0-93f3-a3b501004069")]
pub struct Snl660SwappedClient {
    #[characteristic(uuid = "99cadc24-0ee5-a9e0-93f3-a3b502004069", write, write_without_response)]
    pub control: [u8; 5],
}

/// Whichever service layout the fixture turned out to have.
pub enum ControlClient {
    Canonical(Snl660Client),
    Swapped(Snl660SwappedClient),
}

impl ControlClient {
    /// Discover the control characteristic on the connected fixture.
    pub async fn discover(conn: &Connection) -> Result<Self, BleError> {
        debug!("Discovering SNL660 service...");

        match gatt_client::discover::<Snl660Client>(conn).await {
            Ok(client) => {
                info!("SNL660 service discovered");
                return Ok(ControlClient::Canonical(client));
            }
            Err(_) => debug!("Canonical service UUID not found, trying swapped"),
        }

        match gatt_client::discover::<Snl660SwappedClient>(conn).await {
            Ok(client) => {
                info!("SNL660 service discovered (swapped UUID)");
                Ok(ControlClient::Swapped(client))
            }
            Err(_) => {
                warn!("SNL660 control service not found");
                Err(BleError::ServiceNotFound)
            }
        }
    }

    /// Write every packet of `request`, stopping at the first failure.
    pub async fn write(&self, conn: &Connection, request: &WriteRequest) -> Result<(), WriteError> {
        for packet in request.control_packets()? {
            let result = match self {
                ControlClient::Canonical(c) => c.control_write_without_response(packet.as_bytes()).await,
                ControlClient::Swapped(c) => c.control_write_without_response(packet.as_bytes()).await,
            };

            if result.is_err() {
                return Err(if conn.is_connected() {
                    WriteError::Rejected
                } else {
                    WriteError::Disconnected
                });
            }
            trace!("Wrote {}", packet);
        }
        Ok(())
    }
}
