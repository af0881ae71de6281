//! BLE link to the fixture.
//!
//! One task owns the SoftDevice connection for its whole life:
//! resolve the fixture address (configured, stored, or scanned), connect,
//! discover the control characteristic, then serve write requests until
//! the connection drops, and start over.
//!
//! The light task talks to it through a [`LinkHandle`] (a `BleClient`)
//! and receives [`LinkEvent`]s back. All events for a connection,
//! including write completions, are sent before its `Disconnected`.

use core::cell::Cell;

use crate::ble::light_client::ControlClient;
use crate::ble::scanner::{self, record_address};
use crate::ble::{BleClient, ConnectionState, LinkEvent, WriteRequest};
use crate::config::{self, BleClientConfig};
use crate::error::{BleError, Error, WriteError};
use crate::storage::FIXTURE_STORE;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::{central, Address, AddressType, Connection};
use nrf_softdevice::{raw, Flash, Softdevice};

/// Write requests waiting for the link. The driver keeps at most one in flight.
pub const REQUEST_QUEUE: usize = 2;

/// Link events waiting for the light task.
pub const EVENT_QUEUE: usize = 8;

pub type RequestChannel = Channel<CriticalSectionRawMutex, WriteRequest, REQUEST_QUEUE>;
pub type RequestSender = Sender<'static, CriticalSectionRawMutex, WriteRequest, REQUEST_QUEUE>;
pub type RequestReceiver = Receiver<'static, CriticalSectionRawMutex, WriteRequest, REQUEST_QUEUE>;

pub type EventChannel = Channel<CriticalSectionRawMutex, LinkEvent, EVENT_QUEUE>;
pub type EventSender = Sender<'static, CriticalSectionRawMutex, LinkEvent, EVENT_QUEUE>;
pub type EventReceiver = Receiver<'static, CriticalSectionRawMutex, LinkEvent, EVENT_QUEUE>;

/// Connection state shared between the link task and its handles.
pub struct LinkState {
    state: Mutex<CriticalSectionRawMutex, Cell<ConnectionState>>,
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(ConnectionState::Disconnected)),
        }
    }

    pub fn get(&self) -> ConnectionState {
        self.state.lock(|s| s.get())
    }

    fn set(&self, state: ConnectionState) {
        self.state.lock(|s| s.set(state));
    }
}

/// Non-owning handle the light driver uses to reach the link.
#[derive(Clone, Copy)]
pub struct LinkHandle {
    state: &'static LinkState,
    requests: RequestSender,
}

impl LinkHandle {
    pub fn new(state: &'static LinkState, requests: RequestSender) -> Self {
        Self { state, requests }
    }
}

impl BleClient for LinkHandle {
    fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    fn write(&mut self, request: WriteRequest) -> Result<(), WriteError> {
        if self.state.get() != ConnectionState::Connected {
            return Err(WriteError::NotConnected);
        }
        self.requests.try_send(request).map_err(|_| WriteError::Busy)
    }
}

pub async fn link_task(
    sd: &'static Softdevice,
    client: BleClientConfig<'static>,
    state: &'static LinkState,
    requests: RequestReceiver,
    events: EventSender,
) -> ! {
    let mut flash = Flash::take(sd);
    {
        let mut store = FIXTURE_STORE.lock().await;
        if store.load_from_flash(&mut flash).await.is_err() {
            warn!("Fixture storage unreadable, will scan");
        }
    }

    loop {
        state.set(ConnectionState::Connecting);

        match connect(sd, &client, &mut flash).await {
            Ok((conn, control)) => {
                state.set(ConnectionState::Connected);
                events.send(LinkEvent::Connected).await;

                serve(&conn, &control, &requests, &events).await;
                info!("Link to fixture closed");
            }
            Err(e) => warn!("Link to fixture failed: {}", e),
        }

        state.set(ConnectionState::Disconnected);
        // Requests queued against the dead link fail before `Disconnected`.
        while requests.try_receive().is_ok() {
            events
                .send(LinkEvent::WriteComplete(Err(WriteError::Disconnected)))
                .await;
        }
        events.send(LinkEvent::Disconnected).await;

        Timer::after(Duration::from_millis(config::BLE_RECONNECT_DELAY_MS)).await;
    }
}

async fn connect(
    sd: &'static Softdevice,
    client: &BleClientConfig<'static>,
    flash: &mut Flash,
) -> Result<(Connection, ControlClient), Error> {
    let address = resolve_address(sd, client, flash).await?;

    let whitelist = [&address];
    let conn_cfg = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };

    info!("Connecting to fixture ({})", client.id);
    let conn = central::connect(sd, &conn_cfg)
        .await
        .map_err(|_| BleError::ConnectFailed)?;

    match ControlClient::discover(&conn).await {
        Ok(control) => Ok((conn, control)),
        Err(e) => {
            let _ = conn.disconnect();
            Err(e.into())
        }
    }
}

/// Configured address first, then the stored one, then a fresh scan.
async fn resolve_address(
    sd: &'static Softdevice,
    client: &BleClientConfig<'static>,
    flash: &mut Flash,
) -> Result<Address, Error> {
    if let Some(mut bytes) = client.address {
        // Configured most significant byte first; the SoftDevice wants LSB first.
        bytes.reverse();
        return Ok(Address::new(AddressType::Public, bytes));
    }

    let mut store = FIXTURE_STORE.lock().await;
    if let Some(record) = store.get() {
        return Ok(record_address(record));
    }

    let found = scanner::scan(sd).await?;
    store.set(found.record());
    if store.save_to_flash(flash).await.is_err() {
        warn!("Could not persist fixture address");
    }
    Ok(found.address)
}

/// Serve write requests until the connection drops.
async fn serve(
    conn: &Connection,
    control: &ControlClient,
    requests: &RequestReceiver,
    events: &EventSender,
) {
    let supervision = Duration::from_millis(config::BLE_LINK_SUPERVISION_MS);

    loop {
        match select(requests.receive(), Timer::after(supervision)).await {
            Either::First(request) => {
                let result = control.write(conn, &request).await;
                events.send(LinkEvent::WriteComplete(result)).await;
            }
            Either::Second(()) => {}
        }

        if !conn.is_connected() {
            return;
        }
    }
}
