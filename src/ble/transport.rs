//! Platform collaborators driven by the device session.
//!
//! Every method starts an operation and returns immediately. Outcomes are
//! posted later as [`SessionEvent`](crate::ble::SessionEvent)s on the
//! supplied [`EventSender`]. An `Err` return means the operation could not
//! even be started.

use uuid::Uuid;

use crate::ble::events::{DeviceRef, EventSender, LinkId};
use crate::error::Result;

/// Discovers peripherals.
pub trait Scanner: Send {
    /// Begin scanning, posting [`DeviceFound`](crate::ble::SessionEvent::DeviceFound)
    /// for peripherals whose advertised name is `name_filter`, or
    /// [`ScanFailed`](crate::ble::SessionEvent::ScanFailed) if the platform
    /// scan breaks.
    fn start_scan(&mut self, name_filter: &str, events: &EventSender) -> Result<()>;

    /// Stop scanning. No further scan events are posted afterwards.
    fn stop_scan(&mut self);
}

/// Owns physical links to peripherals.
pub trait LinkTransport: Send {
    /// Open a link to `device`; outcome arrives as
    /// [`LinkEvent::Connected`](crate::ble::LinkEvent::Connected) or
    /// [`LinkEvent::ConnectFailed`](crate::ble::LinkEvent::ConnectFailed),
    /// and later [`LinkEvent::Disconnected`](crate::ble::LinkEvent::Disconnected)
    /// if the link drops.
    fn connect(&mut self, link: LinkId, device: &DeviceRef, events: &EventSender) -> Result<()>;

    /// Enumerate services on an open link.
    fn discover_services(&mut self, link: LinkId, events: &EventSender) -> Result<()>;

    /// Read one characteristic on an open link. The outcome carries `read`
    /// so a result for an abandoned request can be told apart.
    fn read_characteristic(
        &mut self,
        link: LinkId,
        read: u64,
        characteristic: Uuid,
        events: &EventSender,
    ) -> Result<()>;

    /// Close and release a link. Must be safe to call on a link that is
    /// already down.
    fn close(&mut self, link: LinkId);
}
