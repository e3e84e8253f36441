//! BLE communication module.
//!
//! This module owns the connection lifecycle: the session state machine,
//! its timers, the transport traits it drives, and the `btleplug`
//! implementation of those traits.

pub mod connection;
pub mod events;
pub mod platform;
pub mod scheduler;
pub mod session;
pub mod timer;
pub mod transport;
pub mod uuids;

#[cfg(test)]
pub(crate) mod fake;

pub use connection::{ConnectionEvent, ConnectionState};
pub use events::{
    event_channel, DeviceRef, EventReceiver, EventSender, GattService, LinkEvent, LinkId,
    SessionEvent,
};
pub use platform::BtleplugTransport;
pub use scheduler::PollScheduler;
pub use session::DeviceSession;
pub use transport::{LinkTransport, Scanner};
pub use uuids::*;
