//! SNL660 control protocol.
//!
//! The panel exposes one writable characteristic. Every command is a
//! 5-byte packet written without response:
//!
//! ```text
//! [0x78, command, 0x01, value, checksum]
//! ```
//!
//! where `checksum` is the low byte of the sum of the first four bytes.
//!
//! | command | meaning            | value                        |
//! |---------|--------------------|------------------------------|
//! | `0x81`  | power              | `0x01` on, `0x02` off        |
//! | `0x82`  | brightness         | 0 ..= 100 (percent)          |
//! | `0x83`  | colour temperature | 32 ..= 56 (hundreds of kelvin) |

use heapless::Vec;

use super::{DesiredState, LightTraits};
use crate::error::InputRangeError;

/// Primary service, as printed in the usual big-endian UUID notation.
pub const SERVICE_UUID: [u8; 16] = [
    0x69, 0x40, 0x00, 0x01, 0xB5, 0xA3, 0xF3, 0x93, 0xE0, 0xA9, 0xE5, 0x0E, 0x24, 0xDC, 0xCA, 0x99,
];

/// Control characteristic (write, write without response).
pub const CONTROL_CHARACTERISTIC_UUID: [u8; 16] = [
    0x69, 0x40, 0x00, 0x02, 0xB5, 0xA3, 0xF3, 0x93, 0xE0, 0xA9, 0xE5, 0x0E, 0x24, 0xDC, 0xCA, 0x99,
];

/// First byte of every packet.
pub const PACKET_HEADER: u8 = 0x78;

/// Packet length on the wire.
pub const PACKET_LEN: usize = 5;

/// Upper bound on packets needed to move the fixture to any state.
pub const MAX_PACKETS_PER_WRITE: usize = 3;

const CMD_POWER: u8 = 0x81;
const CMD_BRIGHTNESS: u8 = 0x82;
const CMD_TEMPERATURE: u8 = 0x83;

const POWER_ON: u8 = 0x01;
const POWER_OFF: u8 = 0x02;

/// Encoded brightness range.
pub const BRIGHTNESS_MIN: u8 = 0;
pub const BRIGHTNESS_MAX: u8 = 100;

/// Colour temperature range, in kelvin and as encoded.
pub const KELVIN_MIN: f32 = 3200.0;
pub const KELVIN_MAX: f32 = 5600.0;
pub const KELVIN_DEFAULT: f32 = 4500.0;
pub const TEMPERATURE_MIN: u8 = 32;
pub const TEMPERATURE_MAX: u8 = 56;

/// Reverse a big-endian UUID into the little-endian order used on air.
pub const fn uuid_le(uuid: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let mut i = 0;
    while i < 16 {
        out[i] = uuid[15 - i];
        i += 1;
    }
    out
}

/// One fixture command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Power(bool),
    Brightness(u8),
    Temperature(u8),
}

impl Command {
    pub fn encode(self) -> Packet {
        let (command, value) = match self {
            Command::Power(true) => (CMD_POWER, POWER_ON),
            Command::Power(false) => (CMD_POWER, POWER_OFF),
            Command::Brightness(v) => (CMD_BRIGHTNESS, v),
            Command::Temperature(v) => (CMD_TEMPERATURE, v),
        };
        Packet::new(command, value)
    }
}

/// A ready-to-write 5-byte packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet(pub [u8; PACKET_LEN]);

impl Packet {
    fn new(command: u8, value: u8) -> Self {
        let mut bytes = [PACKET_HEADER, command, 0x01, value, 0];
        bytes[4] = checksum(&bytes[..4]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }
}

/// Low byte of the sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// What the fixture shows, at the resolution it understands.
///
/// While off, brightness and temperature are irrelevant, so every off
/// state compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixtureState {
    Off,
    On { brightness: u8, temperature: u8 },
}

/// Result of encoding a [`DesiredState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    pub state: FixtureState,
    /// Set when an input had to be clamped. Brightness wins if both were.
    pub out_of_range: Option<InputRangeError>,
}

impl FixtureState {
    /// Encode a desired state, clamping anything the fixture cannot show.
    pub fn encode(desired: &DesiredState, traits: &LightTraits) -> Encoded {
        let (brightness, brightness_clamped) = encode_brightness(desired.brightness);
        let (temperature, temperature_clamped) = encode_temperature(desired.color_temperature, traits);

        let out_of_range = if brightness_clamped {
            Some(InputRangeError::Brightness)
        } else if temperature_clamped {
            Some(InputRangeError::ColorTemperature)
        } else {
            None
        };

        let state = if desired.on {
            FixtureState::On {
                brightness,
                temperature,
            }
        } else {
            FixtureState::Off
        };

        Encoded { state, out_of_range }
    }
}

/// Brightness fraction to percent. Returns `(value, clamped)`.
pub fn encode_brightness(brightness: f32) -> (u8, bool) {
    if brightness.is_nan() {
        return (BRIGHTNESS_MIN, true);
    }
    let clamped = !(0.0..=1.0).contains(&brightness);
    let b = brightness.clamp(0.0, 1.0);
    // b >= 0, so adding one half and truncating rounds to nearest.
    let value = (b * BRIGHTNESS_MAX as f32 + 0.5) as u8;
    (value.min(BRIGHTNESS_MAX), clamped)
}

/// Mireds to hundreds of kelvin. Returns `(value, clamped)`.
pub fn encode_temperature(mireds: Option<f32>, traits: &LightTraits) -> (u8, bool) {
    let (kelvin, clamped) = match mireds {
        Some(m) if m.is_nan() => (KELVIN_DEFAULT, true),
        Some(m) if m > 1.0 => (1_000_000.0 / m, m < traits.min_mireds || m > traits.max_mireds),
        Some(_) => (KELVIN_DEFAULT, true),
        None => (KELVIN_DEFAULT, false),
    };
    let kelvin = kelvin.clamp(KELVIN_MIN, KELVIN_MAX);
    let value = (kelvin / 100.0 + 0.5) as u8;
    (value.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX), clamped)
}

/// Packets that move the fixture from `known` to `target`.
///
/// `known == None` means the fixture's state is unknown (first write, or
/// after a reconnect) and everything relevant is sent.
pub fn plan(known: Option<FixtureState>, target: FixtureState) -> Vec<Packet, MAX_PACKETS_PER_WRITE> {
    let mut packets = Vec::new();
    let mut push = |c: Command| {
        // Capacity covers the worst case of power + brightness + temperature.
        let _ = packets.push(c.encode());
    };

    match target {
        FixtureState::Off => {
            if known != Some(FixtureState::Off) {
                push(Command::Power(false));
            }
        }
        FixtureState::On {
            brightness,
            temperature,
        } => match known {
            Some(FixtureState::On {
                brightness: b,
                temperature: t,
            }) => {
                if b != brightness {
                    push(Command::Brightness(brightness));
                }
                if t != temperature {
                    push(Command::Temperature(temperature));
                }
            }
            _ => {
                push(Command::Power(true));
                push(Command::Brightness(brightness));
                push(Command::Temperature(temperature));
            }
        },
    }

    packets
}
