//! Unit tests for the light driver state machine.
//!
//! These tests run on the host (not embedded) against an in-memory BLE
//! client that records every write request.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use super::protocol::{Command, FixtureState};
use super::{DesiredState, DriverState, LightDriver, LightTraits};
use crate::ble::{BleClient, ConnectionState, WriteRequest};
use crate::error::{ConfigError, WriteError};

// ═══════════════════════════════════════════════════════════════════════════
// Mock BLE client
// ═══════════════════════════════════════════════════════════════════════════

struct Link {
    state: ConnectionState,
    requests: Vec<WriteRequest>,
    refuse_writes: bool,
}

#[derive(Clone)]
struct MockClient(Rc<RefCell<Link>>);

impl MockClient {
    fn new(state: ConnectionState) -> Self {
        Self(Rc::new(RefCell::new(Link {
            state,
            requests: Vec::new(),
            refuse_writes: false,
        })))
    }

    fn set_state(&self, state: ConnectionState) {
        self.0.borrow_mut().state = state;
    }

    fn request_count(&self) -> usize {
        self.0.borrow().requests.len()
    }

    fn last_request(&self) -> WriteRequest {
        self.0.borrow().requests.last().cloned().unwrap()
    }
}

impl BleClient for MockClient {
    fn connection_state(&self) -> ConnectionState {
        self.0.borrow().state
    }

    fn write(&mut self, request: WriteRequest) -> Result<(), WriteError> {
        let mut link = self.0.borrow_mut();
        if link.refuse_writes {
            return Err(WriteError::Busy);
        }
        link.requests.push(request);
        Ok(())
    }
}

fn driver_with(client: &MockClient) -> LightDriver<MockClient> {
    let mut driver = LightDriver::new(LightTraits::snl660());
    driver.set_ble_client(client.clone());
    driver.setup().unwrap();
    driver
}

fn connect(driver: &mut LightDriver<MockClient>, client: &MockClient) {
    client.set_state(ConnectionState::Connected);
    driver.on_connected();
}

fn disconnect(driver: &mut LightDriver<MockClient>, client: &MockClient) {
    client.set_state(ConnectionState::Disconnected);
    driver.on_disconnected();
}

/// Tick and immediately complete whatever got submitted.
fn run_ticks(driver: &mut LightDriver<MockClient>, ticks: usize) {
    for _ in 0..ticks {
        driver.on_tick();
        if driver.write_in_flight() {
            driver.on_write_complete(Ok(()));
        }
    }
}

const HALF: DesiredState = DesiredState::on(0.5);

// ═══════════════════════════════════════════════════════════════════════════
// Binding & setup
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn setup_without_client_is_a_configuration_error() {
    let mut driver: LightDriver<MockClient> = LightDriver::new(LightTraits::snl660());
    assert_eq!(driver.setup(), Err(ConfigError::BleClientNotBound));
}

#[test]
fn second_binding_replaces_first() {
    let first = MockClient::new(ConnectionState::Connected);
    let second = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&first);
    driver.set_ble_client(second.clone());

    driver.write_state(HALF);
    run_ticks(&mut driver, 2);

    assert_eq!(first.request_count(), 0);
    assert_eq!(second.request_count(), 1);
}

#[test]
fn unbound_driver_ticks_quietly() {
    let mut driver: LightDriver<MockClient> = LightDriver::new(LightTraits::snl660());
    driver.write_state(HALF);
    driver.on_tick();
    assert_eq!(driver.state(), DriverState::AwaitingConnection);
}

// ═══════════════════════════════════════════════════════════════════════════
// State machine scenarios
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn starts_idle() {
    let client = MockClient::new(ConnectionState::Disconnected);
    let driver = driver_with(&client);
    assert_eq!(driver.state(), DriverState::Idle);
    assert!(driver.pending().is_none());
    assert!(driver.last_sent().is_none());
}

#[test]
fn write_while_disconnected_then_connect_and_sync() {
    let client = MockClient::new(ConnectionState::Disconnected);
    let mut driver = driver_with(&client);

    driver.write_state(HALF);
    assert_eq!(driver.state(), DriverState::AwaitingConnection);
    driver.on_tick();
    assert_eq!(client.request_count(), 0);

    connect(&mut driver, &client);
    assert_eq!(driver.state(), DriverState::Writing);

    driver.on_tick();
    assert!(driver.write_in_flight());
    assert_eq!(driver.state(), DriverState::Writing);

    driver.on_write_complete(Ok(()));
    assert_eq!(driver.state(), DriverState::Synced);
    assert_eq!(driver.last_sent(), Some(&HALF));
    assert!(driver.pending().is_none());
}

#[test]
fn write_state_never_performs_io() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    driver.write_state(DesiredState::on(0.9));
    assert_eq!(client.request_count(), 0);
}

#[test]
fn first_write_carries_full_state() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF.with_color_temperature(250.0));
    run_ticks(&mut driver, 1);

    let request = client.last_request();
    assert_eq!(
        request.packets.as_slice(),
        &[
            Command::Power(true).encode(),
            Command::Brightness(50).encode(),
            Command::Temperature(40).encode(),
        ]
    );
}

#[test]
fn later_writes_carry_only_changes() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);
    driver.write_state(DesiredState::on(0.8));
    run_ticks(&mut driver, 1);

    assert_eq!(client.request_count(), 2);
    assert_eq!(
        client.last_request().packets.as_slice(),
        &[Command::Brightness(80).encode()]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Coalescing & idempotence
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn coalesces_updates_while_disconnected() {
    let client = MockClient::new(ConnectionState::Disconnected);
    let mut driver = driver_with(&client);

    driver.write_state(DesiredState::on(0.1));
    driver.write_state(DesiredState::on(0.4));
    driver.write_state(DesiredState::off());
    driver.write_state(DesiredState::on(0.7));
    assert_eq!(driver.pending(), Some(&DesiredState::on(0.7)));

    connect(&mut driver, &client);
    run_ticks(&mut driver, 5);

    assert_eq!(client.request_count(), 1);
    assert_eq!(driver.last_sent(), Some(&DesiredState::on(0.7)));
    assert!(client
        .last_request()
        .packets
        .contains(&Command::Brightness(70).encode()));
}

#[test]
fn repeating_last_sent_state_is_a_no_op() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);
    assert_eq!(client.request_count(), 1);

    driver.write_state(HALF);
    assert!(driver.pending().is_none());
    run_ticks(&mut driver, 3);
    assert_eq!(client.request_count(), 1);
    assert_eq!(driver.state(), DriverState::Synced);
}

#[test]
fn turning_off_twice_writes_once() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(DesiredState::off());
    driver.on_tick();
    driver.write_state(DesiredState::off());
    driver.on_write_complete(Ok(()));
    run_ticks(&mut driver, 3);

    assert_eq!(client.request_count(), 1);
    assert_eq!(
        client.last_request().packets.as_slice(),
        &[Command::Power(false).encode()]
    );
    assert_eq!(driver.state(), DriverState::Synced);
}

#[test]
fn states_that_encode_identically_are_equal() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(DesiredState::on(0.501));
    run_ticks(&mut driver, 1);
    driver.write_state(DesiredState::on(0.499));
    run_ticks(&mut driver, 2);

    assert_eq!(client.request_count(), 1);
}

#[test]
fn returning_to_last_sent_drops_unsent_change() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);

    driver.write_state(DesiredState::on(0.9));
    driver.write_state(HALF);
    run_ticks(&mut driver, 2);

    assert_eq!(client.request_count(), 1);
    assert_eq!(driver.state(), DriverState::Synced);
}

#[test]
fn change_during_write_is_sent_afterwards() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    driver.on_tick();
    driver.write_state(DesiredState::on(0.9));
    driver.on_write_complete(Ok(()));

    assert_eq!(driver.last_sent(), Some(&HALF));
    assert_eq!(driver.pending(), Some(&DesiredState::on(0.9)));

    run_ticks(&mut driver, 1);
    assert_eq!(client.request_count(), 2);
    assert_eq!(driver.last_sent(), Some(&DesiredState::on(0.9)));
}

#[test]
fn reverting_during_write_still_converges() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);

    // 0.9 goes on air, then the user goes back to 0.5 before it lands.
    driver.write_state(DesiredState::on(0.9));
    driver.on_tick();
    driver.write_state(HALF);
    driver.on_write_complete(Ok(()));
    run_ticks(&mut driver, 1);

    assert_eq!(client.request_count(), 3);
    assert_eq!(driver.last_sent(), Some(&HALF));
    assert_eq!(driver.state(), DriverState::Synced);
}

// ═══════════════════════════════════════════════════════════════════════════
// Reconnect & failure handling
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn reconnect_resyncs_once() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);
    assert_eq!(client.request_count(), 1);

    disconnect(&mut driver, &client);
    run_ticks(&mut driver, 3);
    assert_eq!(client.request_count(), 1);

    connect(&mut driver, &client);
    run_ticks(&mut driver, 5);

    assert_eq!(client.request_count(), 2);
    // Full state, since the panel may have been power-cycled.
    assert_eq!(client.last_request().packets.len(), 3);
    assert_eq!(driver.state(), DriverState::Synced);
}

#[test]
fn repeating_last_state_after_reconnect_keeps_the_resync() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);
    disconnect(&mut driver, &client);
    connect(&mut driver, &client);

    // The host repeats its target before the resync has gone out.
    driver.write_state(HALF);
    assert_eq!(driver.pending(), Some(&HALF));
    run_ticks(&mut driver, 3);

    assert_eq!(client.request_count(), 2);
    assert_eq!(client.last_request().packets.len(), 3);
    assert_eq!(driver.state(), DriverState::Synced);
}

#[test]
fn reconnect_sends_newest_state_when_changed_offline() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    run_ticks(&mut driver, 1);

    disconnect(&mut driver, &client);
    driver.write_state(DesiredState::off());
    assert_eq!(driver.state(), DriverState::AwaitingConnection);

    connect(&mut driver, &client);
    run_ticks(&mut driver, 3);

    assert_eq!(client.request_count(), 2);
    assert_eq!(driver.last_sent(), Some(&DesiredState::off()));
}

#[test]
fn reconnect_with_nothing_written_stays_idle() {
    let client = MockClient::new(ConnectionState::Disconnected);
    let mut driver = driver_with(&client);

    connect(&mut driver, &client);
    run_ticks(&mut driver, 3);

    assert_eq!(client.request_count(), 0);
    assert_eq!(driver.state(), DriverState::Idle);
}

#[test]
fn retries_until_write_succeeds() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    for attempt in 1..=3 {
        driver.on_tick();
        driver.on_write_complete(Err(WriteError::Rejected));
        assert_eq!(driver.pending(), Some(&HALF));
        assert!(driver.last_sent().is_none());
        assert_eq!(driver.consecutive_failures(), attempt);
    }

    driver.on_tick();
    driver.on_write_complete(Ok(()));

    assert_eq!(client.request_count(), 4);
    assert_eq!(driver.last_sent(), Some(&HALF));
    assert!(driver.pending().is_none());
    assert_eq!(driver.consecutive_failures(), 0);
}

#[test]
fn refused_submission_is_retried() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    client.0.borrow_mut().refuse_writes = true;
    driver.write_state(HALF);
    driver.on_tick();
    driver.on_tick();
    assert_eq!(driver.consecutive_failures(), 2);
    assert!(!driver.write_in_flight());

    client.0.borrow_mut().refuse_writes = false;
    run_ticks(&mut driver, 1);
    assert_eq!(driver.last_sent(), Some(&HALF));
}

#[test]
fn disconnect_mid_write_keeps_command() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(HALF);
    driver.on_tick();
    disconnect(&mut driver, &client);

    assert!(!driver.write_in_flight());
    assert_eq!(driver.pending(), Some(&HALF));
    assert_eq!(driver.state(), DriverState::AwaitingConnection);

    // A late completion for the dropped write changes nothing.
    driver.on_write_complete(Ok(()));
    assert!(driver.last_sent().is_none());

    connect(&mut driver, &client);
    run_ticks(&mut driver, 1);
    assert_eq!(driver.last_sent(), Some(&HALF));
}

#[test]
fn tick_notices_unannounced_connection() {
    let client = MockClient::new(ConnectionState::Disconnected);
    let mut driver = driver_with(&client);
    driver.write_state(HALF);

    client.set_state(ConnectionState::Connected);
    run_ticks(&mut driver, 1);

    assert_eq!(client.request_count(), 1);
    assert_eq!(driver.state(), DriverState::Synced);
}

#[test]
fn connecting_is_not_connected() {
    let client = MockClient::new(ConnectionState::Connecting);
    let mut driver = driver_with(&client);
    driver.write_state(HALF);
    run_ticks(&mut driver, 3);

    assert_eq!(client.request_count(), 0);
    assert_eq!(driver.state(), DriverState::AwaitingConnection);
}

#[test]
fn out_of_range_input_is_clamped_not_dropped() {
    let client = MockClient::new(ConnectionState::Connected);
    let mut driver = driver_with(&client);
    connect(&mut driver, &client);

    driver.write_state(DesiredState::on(1.5).with_color_temperature(900.0));
    run_ticks(&mut driver, 1);

    let packets = client.last_request().packets;
    assert!(packets.contains(&Command::Brightness(100).encode()));
    assert!(packets.contains(&Command::Temperature(32).encode()));
    assert_eq!(
        FixtureState::encode(driver.last_sent().unwrap(), driver.traits()).state,
        FixtureState::On {
            brightness: 100,
            temperature: 32
        }
    );
}
