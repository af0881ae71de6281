//! Push buttons, active-low with the internal pull-up.
//!
//! One task per pin. A press is debounced and forwarded as a
//! [`ButtonEvent`]; holding UP or DOWN repeats the event so the panel can
//! be dimmed without tapping.

use crate::config::{BUTTON_DEBOUNCE_MS, BUTTON_REPEAT_DELAY_MS, BUTTON_REPEAT_MS};
use crate::ui::ButtonEvent;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Timer};

pub const BUTTON_QUEUE: usize = 4;

pub type ButtonSender = Sender<'static, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE>;

pub async fn button_task(pin: AnyPin, event: ButtonEvent, tx: ButtonSender) -> ! {
    let mut btn = Input::new(pin, Pull::Up);
    let repeats = matches!(event, ButtonEvent::Up | ButtonEvent::Down);

    loop {
        btn.wait_for_low().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        if btn.is_high() {
            continue;
        }

        debug!("Button: {}", event);
        tx.send(event).await;

        let mut hold = Duration::from_millis(BUTTON_REPEAT_DELAY_MS);
        loop {
            if !repeats {
                btn.wait_for_high().await;
                break;
            }
            match select(btn.wait_for_high(), Timer::after(hold)).await {
                Either::First(()) => break,
                Either::Second(()) => {
                    // Drop repeats the light task has not caught up with.
                    let _ = tx.try_send(event);
                    hold = Duration::from_millis(BUTTON_REPEAT_MS);
                }
            }
        }
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
    }
}
