//! Firmware entry point.
//!
//! Task layout:
//!
//! ```text
//!  buttons x3 ──ButtonEvent──▶ light_task ──WriteRequest──▶ link_task ──GATT──▶ SNL660
//!                                  ▲                            │
//!                                  └────────LinkEvent───────────┘
//! ```

#![no_std]
#![no_main]

use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Pin};
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use nrf_softdevice::{raw, Softdevice};
use {defmt_rtt as _, panic_probe as _};

use snl660_light::ble::link::{self, EventChannel, EventReceiver, EventSender, LinkHandle, LinkState, RequestChannel, RequestReceiver};
use snl660_light::config::{self, BleClientConfig};
use snl660_light::light::{task, LightDriver, LightTraits};
use snl660_light::ui::buttons::{self, BUTTON_QUEUE};
use snl660_light::ui::ButtonEvent;

static BUTTONS: Channel<CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE> = Channel::new();
static LINK_EVENTS: EventChannel = Channel::new();
static WRITE_REQUESTS: RequestChannel = Channel::new();
static LINK_STATE: LinkState = LinkState::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn link_task(
    sd: &'static Softdevice,
    client: BleClientConfig<'static>,
    requests: RequestReceiver,
    events: EventSender,
) -> ! {
    link::link_task(sd, client, &LINK_STATE, requests, events).await
}

#[embassy_executor::task]
async fn light_task(
    driver: LightDriver<LinkHandle>,
    buttons: Receiver<'static, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE>,
    events: EventReceiver,
) -> ! {
    task::light_task(driver, buttons, events).await
}

#[embassy_executor::task(pool_size = 3)]
async fn button_task(pin: AnyPin, event: ButtonEvent) -> ! {
    buttons::button_task(pin, event, BUTTONS.sender()).await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 0,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("snl660-light starting");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    let sd: &'static Softdevice = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));

    let mut driver = LightDriver::new(LightTraits::snl660());

    match config::shipped_light() {
        Ok(light) => {
            info!("Light output '{}' on BLE client '{}'", light.output_id, light.client.id);
            driver.set_ble_client(LinkHandle::new(&LINK_STATE, WRITE_REQUESTS.sender()));
            unwrap!(spawner.spawn(link_task(
                sd,
                light.client,
                WRITE_REQUESTS.receiver(),
                LINK_EVENTS.sender(),
            )));
        }
        // The driver stays unbound; its setup reports the problem and parks.
        Err(e) => error!("Invalid light configuration: {}", e),
    }

    unwrap!(spawner.spawn(light_task(
        driver,
        BUTTONS.receiver(),
        LINK_EVENTS.receiver(),
    )));

    unwrap!(spawner.spawn(button_task(p.P0_11.degrade(), ButtonEvent::Power)));
    unwrap!(spawner.spawn(button_task(p.P0_12.degrade(), ButtonEvent::Up)));
    unwrap!(spawner.spawn(button_task(p.P0_24.degrade(), ButtonEvent::Down)));
}
