//! Local controls - three push buttons on the bridge.
//!
//! On a bare board there is no home-automation host, so the buttons act
//! as the light abstraction that feeds desired states to the driver:
//!
//! - **POWER** - toggle the panel on/off
//! - **UP**    - brighter (repeats while held)
//! - **DOWN**  - dimmer (repeats while held)

#[cfg(feature = "embedded")]
pub mod buttons;
pub mod input_logic;

/// Physical button events (after debouncing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    Power,
    Up,
    Down,
}
