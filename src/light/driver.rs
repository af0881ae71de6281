//! SNL660 light driver.
//!
//! Turns desired light states into control-characteristic writes and keeps
//! the panel converging on the latest one:
//!
//! - **Coalescing**: at most one pending command; a newer desired state
//!   replaces an unsent one.
//! - **Idempotence**: a state equal to what was last written produces no
//!   BLE traffic. Equality is judged on the encoded [`FixtureState`].
//! - **Resync**: after every (re)connection the last state is re-sent in
//!   full, because the panel keeps nothing across a disconnect.
//! - **Retry**: a failed write leaves the pending command in place and is
//!   retried on a later tick. Nothing accepted is dropped except by
//!   coalescing.
//!
//! The driver is single-threaded and never blocks. `write_state` only
//! records intent; I/O is started from `on_tick` and finishes through
//! `on_write_complete`.

use super::protocol::{self, FixtureState, CONTROL_CHARACTERISTIC_UUID};
use super::{DesiredState, LightTraits};
use crate::ble::{BleClient, ConnectionState, WriteRequest};
use crate::config::WRITE_FAILURE_LOG_EVERY;
use crate::error::{ConfigError, WriteError};

/// Where the driver is in its write cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// Nothing written yet and nothing to write.
    Idle,
    /// Work pending, link not connected.
    AwaitingConnection,
    /// Work pending on a connected link, submitted or about to be.
    Writing,
    /// The panel shows the last desired state.
    Synced,
}

/// A desired state together with its encoding.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Target {
    desired: DesiredState,
    fixture: FixtureState,
}

impl Target {
    fn same_output(&self, other: &Target) -> bool {
        self.fixture == other.fixture
    }
}

pub struct LightDriver<C> {
    client: Option<C>,
    traits: LightTraits,
    /// Newest state not yet confirmed on the panel.
    pending: Option<Target>,
    /// Submitted to the client, waiting for completion.
    in_flight: Option<Target>,
    /// Last state confirmed written.
    last_sent: Option<Target>,
    /// What the panel is known to show on the current connection.
    /// `None` after a reconnect: the next write carries the full state.
    known: Option<FixtureState>,
    /// Whether the driver has seen the link come up.
    link_up: bool,
    failures: u32,
}

impl<C: BleClient> LightDriver<C> {
    pub const fn new(traits: LightTraits) -> Self {
        Self {
            client: None,
            traits,
            pending: None,
            in_flight: None,
            last_sent: None,
            known: None,
            link_up: false,
            failures: 0,
        }
    }

    /// Bind the BLE client collaborator. A second call replaces the first.
    pub fn set_ble_client(&mut self, client: C) {
        if self.client.is_some() {
            debug!("Light driver: replacing BLE client binding");
        }
        self.client = Some(client);
    }

    /// Startup hook. Fails if no BLE client was bound.
    pub fn setup(&mut self) -> Result<(), ConfigError> {
        if self.client.is_none() {
            error!("Light driver: no BLE client bound");
            return Err(ConfigError::BleClientNotBound);
        }
        info!(
            "Light driver ready ({} - {} mireds)",
            self.traits.min_mireds, self.traits.max_mireds
        );
        Ok(())
    }

    /// Record a new desired state. Never blocks and performs no I/O.
    pub fn write_state(&mut self, state: DesiredState) {
        let encoded = FixtureState::encode(&state, &self.traits);
        if let Some(e) = encoded.out_of_range {
            warn!("Light driver: clamped out-of-range input ({})", e);
        }
        let target = Target {
            desired: state,
            fixture: encoded.state,
        };

        if self.in_flight.is_some() {
            // Keep a pending entry even if it matches the in-flight write;
            // it is only cleared once that write is confirmed.
            self.pending = Some(target);
            return;
        }

        if self.pending.is_none() && self.last_sent.is_some_and(|s| s.same_output(&target)) {
            return;
        }

        // A queued resync is replaced, never cleared. `on_tick` confirms
        // without traffic when the panel is known to show `target`.
        trace!("Light driver: pending {}", target.fixture);
        self.pending = Some(target);
    }

    /// Scheduler tick. Starts a write when there is work and a link.
    pub fn on_tick(&mut self) {
        let Some(connection) = self.client.as_ref().map(|c| c.connection_state()) else {
            return;
        };

        // Pick up transitions the client did not announce.
        match (connection == ConnectionState::Connected, self.link_up) {
            (true, false) => self.on_connected(),
            (false, true) => self.on_disconnected(),
            _ => {}
        }

        if connection != ConnectionState::Connected || self.in_flight.is_some() {
            return;
        }
        let Some(target) = self.pending else {
            return;
        };

        let packets = protocol::plan(self.known, target.fixture);
        if packets.is_empty() {
            // The panel already shows this; nothing to put on air.
            self.confirm(target);
            return;
        }

        let request = WriteRequest {
            characteristic: CONTROL_CHARACTERISTIC_UUID,
            packets,
        };

        let Some(client) = self.client.as_mut() else {
            return;
        };
        match client.write(request) {
            Ok(()) => {
                trace!("Light driver: write submitted for {}", target.fixture);
                self.in_flight = Some(target);
            }
            Err(e) => self.record_failure(e),
        }
    }

    /// The BLE client reached `Connected`. Forces a full resync.
    pub fn on_connected(&mut self) {
        self.link_up = true;
        self.known = None;
        self.failures = 0;
        if self.pending.is_none() {
            self.pending = self.last_sent;
        }
        info!(
            "Light driver: link up, {}",
            if self.pending.is_some() { "resync queued" } else { "nothing to send" }
        );
    }

    /// The BLE client lost its connection.
    pub fn on_disconnected(&mut self) {
        self.link_up = false;
        self.known = None;
        if self.in_flight.take().is_some() {
            // `pending` still holds the state; it goes out after reconnect.
            warn!("Light driver: link lost with a write in flight");
        } else {
            info!("Light driver: link down");
        }
    }

    /// Completion of the request submitted from `on_tick`.
    pub fn on_write_complete(&mut self, result: Result<(), WriteError>) {
        let Some(target) = self.in_flight.take() else {
            debug!("Light driver: completion without a write in flight, ignored");
            return;
        };

        match result {
            Ok(()) => self.confirm(target),
            Err(e) => self.record_failure(e),
        }
    }

    fn confirm(&mut self, target: Target) {
        if self.failures > 0 {
            info!("Light driver: write succeeded after {} failures", self.failures);
        }
        self.failures = 0;
        self.known = Some(target.fixture);
        if self.pending.is_some_and(|p| p.same_output(&target)) {
            self.pending = None;
        }
        self.last_sent = Some(target);
        debug!("Light driver: panel now {}", target.fixture);
    }

    fn record_failure(&mut self, e: WriteError) {
        self.failures = self.failures.saturating_add(1);
        if self.failures == 1 || self.failures % WRITE_FAILURE_LOG_EVERY == 0 {
            warn!("Light driver: write failed ({}), {} in a row, will retry", e, self.failures);
        }
    }

    pub fn state(&self) -> DriverState {
        let connected = self
            .client
            .as_ref()
            .is_some_and(|c| c.connection_state() == ConnectionState::Connected);

        if self.in_flight.is_some() {
            DriverState::Writing
        } else if self.pending.is_some() {
            if connected {
                DriverState::Writing
            } else {
                DriverState::AwaitingConnection
            }
        } else if self.last_sent.is_some() {
            DriverState::Synced
        } else {
            DriverState::Idle
        }
    }

    /// The desired state waiting to be written, if any.
    pub fn pending(&self) -> Option<&DesiredState> {
        self.pending.as_ref().map(|t| &t.desired)
    }

    /// The last desired state confirmed on the panel.
    pub fn last_sent(&self) -> Option<&DesiredState> {
        self.last_sent.as_ref().map(|t| &t.desired)
    }

    pub fn write_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn traits(&self) -> &LightTraits {
        &self.traits
    }
}
