//! The light task: one cooperative loop feeding the driver.
//!
//! Button presses become desired states, link events become driver
//! notifications, and a fixed ticker drives retries and coalescing.

use crate::ble::link::{EventReceiver, LinkHandle};
use crate::ble::LinkEvent;
use crate::config::TICK_INTERVAL_MS;
use crate::light::{DesiredState, LightDriver};
use crate::ui::buttons::BUTTON_QUEUE;
use crate::ui::input_logic::apply_button;
use crate::ui::ButtonEvent;
use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Ticker, Timer};

pub async fn light_task(
    mut driver: LightDriver<LinkHandle>,
    buttons: Receiver<'static, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE>,
    events: EventReceiver,
) -> ! {
    if let Err(e) = driver.setup() {
        error!("Light output disabled: {}", e);
        loop {
            Timer::after(Duration::from_secs(3600)).await;
        }
    }

    let mut desired = DesiredState::off();
    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));

    loop {
        match select3(buttons.receive(), events.receive(), ticker.next()).await {
            Either3::First(button) => {
                desired = apply_button(desired, button);
                driver.write_state(desired);
            }
            Either3::Second(LinkEvent::Connected) => driver.on_connected(),
            Either3::Second(LinkEvent::Disconnected) => driver.on_disconnected(),
            Either3::Second(LinkEvent::WriteComplete(result)) => driver.on_write_complete(result),
            Either3::Third(()) => driver.on_tick(),
        }
    }
}
