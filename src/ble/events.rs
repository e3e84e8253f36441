//! Events delivered to the device session.
//!
//! Scanner results, link callbacks and timer ticks all arrive through one
//! ordered channel and are handled one at a time by
//! [`DeviceSession::handle`](crate::ble::DeviceSession::handle).

use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sending half of the session event queue.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Receiving half of the session event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create a session event queue.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Identifies one connection attempt.
///
/// Every attempt gets a fresh id, so callbacks from a link that has since
/// been closed can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// A peripheral reported by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    /// Platform identifier of the peripheral.
    pub id: String,
    /// Advertised local name.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

/// A discovered GATT service and its characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// Service UUID.
    pub uuid: Uuid,
    /// UUIDs of the characteristics in this service.
    pub characteristics: Vec<Uuid>,
}

/// Callback from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link came up.
    Connected,
    /// The link could not be established.
    ConnectFailed {
        /// Platform error text.
        reason: String,
    },
    /// The link went down.
    Disconnected,
    /// Service discovery completed.
    ServicesFound(Vec<GattService>),
    /// Service discovery failed.
    DiscoveryFailed {
        /// Platform error text.
        reason: String,
    },
    /// A characteristic read completed.
    ReadResult {
        /// Sequence number the read was issued under.
        read: u64,
        /// Payload bytes.
        data: Vec<u8>,
    },
    /// A characteristic read failed or timed out.
    ReadFailed {
        /// Sequence number the read was issued under.
        read: u64,
        /// Platform error text.
        reason: String,
    },
}

/// Everything the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The scanner saw a peripheral.
    DeviceFound(DeviceRef),
    /// The platform scan failed.
    ScanFailed {
        /// Platform error text.
        reason: String,
    },
    /// The scan deadline armed under `generation` expired.
    ScanTimeout {
        /// Deadline generation.
        generation: u64,
    },
    /// Callback from the link identified by `link`.
    Link {
        /// Originating link.
        link: LinkId,
        /// What happened.
        event: LinkEvent,
    },
    /// Poll interval elapsed for the schedule started under `generation`.
    PollTick {
        /// Schedule generation.
        generation: u64,
    },
}

impl SessionEvent {
    /// Shorthand for a link callback.
    pub fn link(link: LinkId, event: LinkEvent) -> Self {
        Self::Link { link, event }
    }
}
