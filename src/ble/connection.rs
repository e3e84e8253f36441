//! Connection state of the device session.

/// Where the session is in its scan/connect/poll lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Scanning for the peripheral.
    Scanning,
    /// Opening a link to the matched peripheral.
    Connecting,
    /// Link is up, enumerating services.
    ServiceDiscovery,
    /// Characteristic located, polling.
    Ready,
    /// Tearing down the link.
    Disconnecting,
}

impl ConnectionState {
    /// Check if readings can flow.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if a link object may be held in this state.
    pub fn holds_link(&self) -> bool {
        matches!(self, Self::Connecting | Self::ServiceDiscovery | Self::Ready)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Connecting => write!(f, "Connecting"),
            Self::ServiceDiscovery => write!(f, "ServiceDiscovery"),
            Self::Ready => write!(f, "Ready"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Event for connection state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// State before the change.
    pub previous: ConnectionState,
    /// The new connection state.
    pub state: ConnectionState,
}
