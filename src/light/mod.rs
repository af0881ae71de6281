//! Light model for the SNL660 panel.
//!
//! The host side (buttons, automation, whatever feeds the driver) speaks in
//! [`DesiredState`]: power, a brightness fraction and an optional colour
//! temperature in mireds. The fixture only understands integer brightness
//! percent and colour temperature in hundreds of kelvin, see [`protocol`].

pub mod driver;
pub mod protocol;
#[cfg(feature = "embedded")]
pub mod task;

#[cfg(test)]
mod tests;

pub use driver::{DriverState, LightDriver};
pub use protocol::{FixtureState, Packet};

/// Colour modes a light output can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorMode {
    /// White light with adjustable colour temperature.
    ColorTemperature,
}

/// What the fixture can do.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightTraits {
    pub color_mode: ColorMode,
    /// Coolest supported temperature (mireds).
    pub min_mireds: f32,
    /// Warmest supported temperature (mireds).
    pub max_mireds: f32,
}

impl LightTraits {
    /// The SNL660: 3200 K to 5600 K, colour temperature only.
    pub const fn snl660() -> Self {
        Self {
            color_mode: ColorMode::ColorTemperature,
            min_mireds: 179.0, // ~5600 K
            max_mireds: 313.0, // ~3200 K
        }
    }
}

impl Default for LightTraits {
    fn default() -> Self {
        Self::snl660()
    }
}

/// Target light output, as a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DesiredState {
    pub on: bool,
    /// 0.0 ..= 1.0. Out-of-range values are clamped when encoded.
    pub brightness: f32,
    /// Colour temperature in mireds; `None` keeps the fixture's neutral white.
    pub color_temperature: Option<f32>,
}

impl DesiredState {
    /// Light on at `brightness`, neutral white.
    pub const fn on(brightness: f32) -> Self {
        Self {
            on: true,
            brightness,
            color_temperature: None,
        }
    }

    /// Light off.
    pub const fn off() -> Self {
        Self {
            on: false,
            brightness: 0.0,
            color_temperature: None,
        }
    }

    /// Same state with a colour temperature in mireds.
    pub const fn with_color_temperature(mut self, mireds: f32) -> Self {
        self.color_temperature = Some(mireds);
        self
    }
}

impl Default for DesiredState {
    fn default() -> Self {
        Self::off()
    }
}
