use crate::config::BRIGHTNESS_STEP;
use crate::light::DesiredState;
use crate::ui::ButtonEvent;

/// Lowest brightness reachable with DOWN; the panel stays visibly on.
pub const MIN_BUTTON_BRIGHTNESS: f32 = BRIGHTNESS_STEP;

/// Next desired state after a button press.
///
/// UP on a dark panel switches it on. DOWN never switches it off; that is
/// what POWER is for. A panel switched on with zero brightness comes back
/// at the lowest step.
pub fn apply_button(state: DesiredState, event: ButtonEvent) -> DesiredState {
    let mut next = state;
    match event {
        ButtonEvent::Power => {
            next.on = !state.on;
            if next.on && next.brightness < MIN_BUTTON_BRIGHTNESS {
                next.brightness = MIN_BUTTON_BRIGHTNESS;
            }
        }
        ButtonEvent::Up => {
            next.brightness = if state.on {
                (state.brightness + BRIGHTNESS_STEP).min(1.0)
            } else {
                state.brightness.max(MIN_BUTTON_BRIGHTNESS)
            };
            next.on = true;
        }
        ButtonEvent::Down => {
            if state.on {
                next.brightness = (state.brightness - BRIGHTNESS_STEP).max(MIN_BUTTON_BRIGHTNESS);
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_toggles() {
        let on = apply_button(DesiredState::on(0.6), ButtonEvent::Power);
        assert!(!on.on);
        assert_eq!(on.brightness, 0.6);
        assert!(apply_button(on, ButtonEvent::Power).on);
    }

    #[test]
    fn power_on_from_zero_uses_lowest_step() {
        let next = apply_button(DesiredState::off(), ButtonEvent::Power);
        assert!(next.on);
        assert_eq!(next.brightness, MIN_BUTTON_BRIGHTNESS);
    }

    #[test]
    fn up_saturates_at_full() {
        let next = apply_button(DesiredState::on(0.95), ButtonEvent::Up);
        assert_eq!(next.brightness, 1.0);
        assert_eq!(apply_button(next, ButtonEvent::Up).brightness, 1.0);
    }

    #[test]
    fn up_on_dark_panel_switches_on() {
        let mut off = DesiredState::on(0.7);
        off.on = false;
        let next = apply_button(off, ButtonEvent::Up);
        assert!(next.on);
        assert_eq!(next.brightness, 0.7);
    }

    #[test]
    fn down_stops_at_lowest_step() {
        let next = apply_button(DesiredState::on(0.15), ButtonEvent::Down);
        assert!(next.on);
        assert_eq!(next.brightness, MIN_BUTTON_BRIGHTNESS);
    }

    #[test]
    fn down_on_dark_panel_does_nothing() {
        let off = DesiredState::off();
        assert_eq!(apply_button(off, ButtonEvent::Down), off);
    }

    #[test]
    fn colour_temperature_is_kept() {
        let warm = DesiredState::on(0.5).with_color_temperature(300.0);
        let next = apply_button(warm, ButtonEvent::Up);
        assert_eq!(next.color_temperature, Some(300.0));
    }
}
