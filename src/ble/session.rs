//! Connection lifecycle for the single MedCooler peripheral.
//!
//! [`DeviceSession`] is the only owner of the physical link. It moves through
//!
//! ```text
//! Idle -> Scanning -> Connecting -> ServiceDiscovery -> Ready -> Disconnecting -> Idle
//! ```
//!
//! with every failure path returning to `Idle`. Platform callbacks, the scan
//! deadline and poll ticks all arrive as [`SessionEvent`]s and are applied
//! one at a time by [`DeviceSession::handle`]. An event is only acted on if
//! the session is in a state that expects it and it belongs to the current
//! link or timer generation; anything else is logged and dropped.

use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::connection::{ConnectionEvent, ConnectionState};
use crate::ble::events::{DeviceRef, EventSender, GattService, LinkEvent, LinkId, SessionEvent};
use crate::ble::scheduler::PollScheduler;
use crate::ble::timer::Deadline;
use crate::ble::transport::{LinkTransport, Scanner};
use crate::ble::uuids::{PeripheralIdentity, MEDCOOLER};
use crate::config::MonitorConfig;
use crate::data::RawReading;
use crate::error::{Error, Result};

/// Drives scan, connect, discovery and polling for one peripheral.
pub struct DeviceSession<S, L>
where
    S: Scanner,
    L: LinkTransport,
{
    scanner: S,
    transport: L,
    identity: PeripheralIdentity,
    scan_timeout: Duration,
    events: EventSender,
    state: ConnectionState,
    /// Last link id handed out.
    link_counter: u64,
    active_link: Option<LinkId>,
    characteristic: Option<Uuid>,
    scan_deadline: Deadline,
    poll: PollScheduler,
    /// Last read sequence number handed out.
    read_counter: u64,
    /// Read whose result is still expected.
    pending_read: Option<u64>,
    state_tx: broadcast::Sender<ConnectionEvent>,
}

impl<S, L> DeviceSession<S, L>
where
    S: Scanner,
    L: LinkTransport,
{
    /// Create an idle session.
    ///
    /// `events` must be the sending half of the queue whose receiver is fed
    /// back into [`handle`](Self::handle).
    pub fn new(scanner: S, transport: L, config: &MonitorConfig, events: EventSender) -> Self {
        let (state_tx, _) = broadcast::channel(16);

        Self {
            scanner,
            transport,
            identity: MEDCOOLER,
            scan_timeout: config.scan_timeout,
            events,
            state: ConnectionState::Idle,
            link_counter: 0,
            active_link: None,
            characteristic: None,
            scan_deadline: Deadline::new(),
            poll: PollScheduler::new(config.poll_interval),
            read_counter: 0,
            pending_read: None,
            state_tx,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if readings are flowing.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.state_tx.subscribe()
    }

    /// The peripheral this session targets.
    pub fn identity(&self) -> &PeripheralIdentity {
        &self.identity
    }

    /// The link currently held, if any.
    pub fn active_link(&self) -> Option<LinkId> {
        self.active_link
    }

    /// Whether the poll timer is running.
    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    /// Begin scanning for the peripheral.
    ///
    /// A no-op while already scanning.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when a connection is in progress or
    /// established, or the scanner's error if the scan could not start (the
    /// session is back in `Idle` in that case).
    pub fn start_scan(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Idle => {}
            ConnectionState::Scanning => {
                debug!("Already scanning, ignoring start request");
                return Ok(());
            }
            state => {
                warn!("Ignoring scan request while {}", state);
                return Err(Error::InvalidState {
                    operation: "start scan",
                    state,
                });
            }
        }

        info!("Scanning for {}", self.identity.name);
        self.set_state(ConnectionState::Scanning);

        if let Err(e) = self.scanner.start_scan(self.identity.name, &self.events) {
            warn!("Failed to start scan: {}", e);
            self.scanner.stop_scan();
            self.set_state(ConnectionState::Idle);
            return Err(e);
        }

        self.scan_deadline.arm(self.scan_timeout, &self.events);
        Ok(())
    }

    /// Cancel whatever is in progress and return to `Idle`.
    ///
    /// Once this returns no further scan result, poll tick or read result is
    /// acted on, including ones already queued.
    pub fn disconnect(&mut self) {
        match self.state {
            ConnectionState::Idle => {
                debug!("Not connected, ignoring disconnect request");
            }
            ConnectionState::Scanning => {
                info!("Scan cancelled");
                self.end_scan();
                self.set_state(ConnectionState::Idle);
            }
            _ => {
                info!("Disconnecting from {}", self.identity.name);
                self.teardown();
            }
        }
    }

    /// Apply one event.
    ///
    /// Returns the payload of a completed characteristic read.
    pub fn handle(&mut self, event: SessionEvent) -> Option<RawReading> {
        match event {
            SessionEvent::DeviceFound(device) => self.on_device_found(device),
            SessionEvent::ScanFailed { reason } => self.on_scan_failed(&reason),
            SessionEvent::ScanTimeout { generation } => self.on_scan_timeout(generation),
            SessionEvent::Link { link, event } => return self.on_link_event(link, event),
            SessionEvent::PollTick { generation } => self.on_poll_tick(generation),
        }
        None
    }

    fn on_device_found(&mut self, device: DeviceRef) {
        if self.state != ConnectionState::Scanning {
            trace!("Ignoring scan result {} while {}", device.id, self.state);
            return;
        }

        if !self.identity.matches_name(device.name.as_deref()) {
            trace!("Skipping {} ({:?})", device.id, device.name);
            return;
        }

        info!(
            "Found {} at {} (rssi {:?})",
            self.identity.name, device.id, device.rssi
        );

        self.end_scan();
        self.connect(device);
    }

    fn on_scan_failed(&mut self, reason: &str) {
        if self.state != ConnectionState::Scanning {
            debug!("Ignoring scan failure while {}: {}", self.state, reason);
            return;
        }

        warn!("Scan failed: {}", reason);
        self.end_scan();
        self.set_state(ConnectionState::Idle);
    }

    fn on_scan_timeout(&mut self, generation: u64) {
        if self.state != ConnectionState::Scanning || !self.scan_deadline.is_current(generation) {
            debug!("Ignoring stale scan timeout (generation {})", generation);
            return;
        }

        info!("Scan timed out, {} not found", self.identity.name);
        self.end_scan();
        self.set_state(ConnectionState::Idle);
    }

    fn on_link_event(&mut self, link: LinkId, event: LinkEvent) -> Option<RawReading> {
        if self.active_link != Some(link) {
            debug!("Ignoring {:?} from stale {}", event, link);
            return None;
        }

        match (self.state, event) {
            (ConnectionState::Connecting, LinkEvent::Connected) => {
                info!("Connected on {}, discovering services", link);
                self.set_state(ConnectionState::ServiceDiscovery);

                if let Err(e) = self.transport.discover_services(link, &self.events) {
                    warn!("Failed to start service discovery: {}", e);
                    self.fail_link();
                }
            }
            (ConnectionState::Connecting, LinkEvent::ConnectFailed { reason }) => {
                warn!("Connection failed on {}: {}", link, reason);
                self.fail_link();
            }
            (ConnectionState::ServiceDiscovery, LinkEvent::ServicesFound(services)) => {
                self.on_services_found(link, &services);
            }
            (ConnectionState::ServiceDiscovery, LinkEvent::DiscoveryFailed { reason }) => {
                warn!("Service discovery failed on {}: {}", link, reason);
                self.fail_link();
            }
            (ConnectionState::Ready, LinkEvent::ReadResult { read, data }) => {
                if self.pending_read != Some(read) {
                    debug!("Ignoring result of abandoned read {}", read);
                    return None;
                }
                self.pending_read = None;
                trace!("Read {} bytes: {:02X?}", data.len(), data);
                return Some(RawReading::new(data));
            }
            (ConnectionState::Ready, LinkEvent::ReadFailed { read, reason }) => {
                if self.pending_read == Some(read) {
                    self.pending_read = None;
                    debug!("Dropping reading, read failed: {}", reason);
                }
            }
            (_, LinkEvent::Disconnected) => {
                info!("Link {} lost", link);
                self.teardown();
            }
            (state, event) => {
                warn!("Unexpected {:?} on {} while {}", event, link, state);
            }
        }

        None
    }

    fn on_services_found(&mut self, link: LinkId, services: &[GattService]) {
        let located = services
            .iter()
            .filter(|s| s.uuid == self.identity.service)
            .any(|s| s.characteristics.contains(&self.identity.characteristic));

        if !located {
            warn!(
                "Characteristic {} not found in {} service(s)",
                self.identity.characteristic,
                services.len()
            );
            self.fail_link();
            return;
        }

        info!("Temperature characteristic located on {}", link);
        self.characteristic = Some(self.identity.characteristic);
        self.set_state(ConnectionState::Ready);
        self.poll.start(&self.events);
    }

    fn on_poll_tick(&mut self, generation: u64) {
        if self.state != ConnectionState::Ready || !self.poll.is_current(generation) {
            trace!("Ignoring stale poll tick (generation {})", generation);
            return;
        }

        if let Some(stale) = self.pending_read.take() {
            debug!("Read {} still outstanding, abandoning it", stale);
        }

        let (Some(link), Some(characteristic)) = (self.active_link, self.characteristic) else {
            warn!("Ready without a link or characteristic");
            return;
        };

        self.read_counter += 1;
        let read = self.read_counter;
        match self
            .transport
            .read_characteristic(link, read, characteristic, &self.events)
        {
            Ok(()) => self.pending_read = Some(read),
            Err(e) => debug!("Read not issued: {}", e),
        }
    }

    fn connect(&mut self, device: DeviceRef) {
        self.release_link();

        self.link_counter += 1;
        let link = LinkId(self.link_counter);
        self.active_link = Some(link);
        self.set_state(ConnectionState::Connecting);

        debug!("Opening {} to {}", link, device.id);
        if let Err(e) = self.transport.connect(link, &device, &self.events) {
            warn!("Failed to connect to {}: {}", device.id, e);
            self.fail_link();
        }
    }

    fn end_scan(&mut self) {
        self.scan_deadline.cancel();
        self.scanner.stop_scan();
    }

    /// Close the held link, if any, and forget everything tied to it.
    fn release_link(&mut self) {
        if let Some(link) = self.active_link.take() {
            debug!("Closing {}", link);
            self.transport.close(link);
        }
        self.characteristic = None;
        self.pending_read = None;
    }

    /// Connection-phase failure: drop the link and go idle.
    fn fail_link(&mut self) {
        self.release_link();
        self.set_state(ConnectionState::Idle);
    }

    fn teardown(&mut self) {
        if self.state == ConnectionState::Ready {
            self.set_state(ConnectionState::Disconnecting);
        }
        self.poll.stop();
        self.release_link();
        self.set_state(ConnectionState::Idle);
    }

    /// Update the connection state and emit an event.
    fn set_state(&mut self, new_state: ConnectionState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }

        self.state = new_state;
        if old_state == ConnectionState::Ready {
            self.poll.stop();
        }

        debug!("Connection state changed: {} -> {}", old_state, new_state);
        let _ = self.state_tx.send(ConnectionEvent {
            previous: old_state,
            state: new_state,
        });
    }
}

impl<S, L> Drop for DeviceSession<S, L>
where
    S: Scanner,
    L: LinkTransport,
{
    fn drop(&mut self) {
        if self.state == ConnectionState::Scanning {
            self.scanner.stop_scan();
        }
        if self.state.holds_link() {
            if let Some(link) = self.active_link.take() {
                self.transport.close(link);
            }
        }
    }
}

impl<S, L> std::fmt::Debug for DeviceSession<S, L>
where
    S: Scanner,
    L: LinkTransport,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("identity", &self.identity.name)
            .field("state", &self.state)
            .field("active_link", &self.active_link)
            .finish()
    }
}
