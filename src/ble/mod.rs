//! Bluetooth Low Energy subsystem.
//!
//! The firmware drives the Nordic SoftDevice S140 in **Central** role:
//!
//! 1. **Scanner** - finds a nearby SNL660 by its service UUID when no
//!    address is configured.
//! 2. **Light client** - GATT discovery of the SNL660 control
//!    characteristic and packet writes.
//! 3. **Link** - owns the connection, reconnects, serves write requests
//!    and reports status changes to the light task.
//!
//! The light driver never touches the SoftDevice directly. It sees the link
//! through the [`BleClient`] trait and receives [`LinkEvent`]s on the same
//! cooperative loop it runs on.

pub mod adv_parser;

#[cfg(feature = "embedded")]
pub mod light_client;
#[cfg(feature = "embedded")]
pub mod link;
#[cfg(feature = "embedded")]
pub mod scanner;

use heapless::Vec;

use crate::error::WriteError;
use crate::light::protocol::{Packet, CONTROL_CHARACTERISTIC_UUID, MAX_PACKETS_PER_WRITE};

/// Connection state of the BLE client, as observed by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Connected and the control characteristic has been discovered.
    Connected,
}

/// One batch of packets for a single characteristic.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteRequest {
    /// Target characteristic, big-endian UUID notation.
    pub characteristic: [u8; 16],
    /// Written in order.
    pub packets: Vec<Packet, MAX_PACKETS_PER_WRITE>,
}

impl WriteRequest {
    /// Packets for the SNL660 control characteristic.
    ///
    /// The fixture exposes nothing else writable, so a request naming any
    /// other characteristic is `Rejected` without touching the link.
    pub fn control_packets(&self) -> Result<&[Packet], WriteError> {
        if self.characteristic != CONTROL_CHARACTERISTIC_UUID {
            return Err(WriteError::Rejected);
        }
        Ok(self.packets.as_slice())
    }
}

/// Events the link publishes for the light task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Link up and control characteristic ready.
    Connected,
    /// Connection lost or intentionally closed.
    Disconnected,
    /// Outcome of the most recently submitted [`WriteRequest`].
    WriteComplete(Result<(), WriteError>),
}

/// The BLE client collaborator, seen from the light driver.
///
/// Implementations are handles: the driver never owns the connection
/// and never manages its lifecycle.
pub trait BleClient {
    fn connection_state(&self) -> ConnectionState;

    /// Queue a write. Must not block.
    ///
    /// `Ok(())` only means the request was accepted; the outcome arrives
    /// later as [`LinkEvent::WriteComplete`].
    fn write(&mut self, request: WriteRequest) -> Result<(), WriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::protocol::{Command, SERVICE_UUID};

    fn request(characteristic: [u8; 16]) -> WriteRequest {
        let mut packets = Vec::new();
        packets.push(Command::Power(true).encode()).unwrap();
        packets.push(Command::Brightness(40).encode()).unwrap();
        WriteRequest {
            characteristic,
            packets,
        }
    }

    #[test]
    fn control_request_yields_its_packets_in_order() {
        let req = request(CONTROL_CHARACTERISTIC_UUID);
        assert_eq!(
            req.control_packets().unwrap(),
            &[Command::Power(true).encode(), Command::Brightness(40).encode()]
        );
    }

    #[test]
    fn request_for_another_characteristic_is_rejected() {
        assert_eq!(
            request(SERVICE_UUID).control_packets(),
            Err(WriteError::Rejected)
        );
    }
}
