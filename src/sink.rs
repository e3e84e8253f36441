//! Output collaborators: notification delivery and live display.
//!
//! Both are fire-and-forget. The orchestrator never waits on a sink and
//! ignores whether anyone is listening.

use tokio::sync::broadcast;
use tracing::trace;

use crate::data::{AlertEvent, DisplayPreference, Temperature};

/// Receives alerts raised by the threshold alerter.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send {
    /// Deliver one alert. Implementations may suppress sound for alerts
    /// with `should_ring == false`.
    fn deliver(&self, alert: AlertEvent);
}

/// Receives every decoded temperature.
#[cfg_attr(test, mockall::automock)]
pub trait DataSink: Send {
    /// Publish the latest reading together with the unit it should be
    /// shown in. Later calls supersede earlier ones.
    fn publish(&self, temperature: Temperature, preference: DisplayPreference);
}

/// A reading as seen by display observers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadingUpdate {
    /// The decoded temperature.
    pub temperature: Temperature,
    /// Preference in effect when it was published.
    pub preference: DisplayPreference,
}

impl ReadingUpdate {
    /// Two-decimal display text in the preferred unit.
    pub fn display_text(&self) -> String {
        self.temperature.display(self.preference.unit())
    }
}

/// Forwards alerts and readings to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    alert_tx: broadcast::Sender<AlertEvent>,
    reading_tx: broadcast::Sender<ReadingUpdate>,
}

impl BroadcastSink {
    /// Create a sink with no subscribers.
    pub fn new() -> Self {
        let (alert_tx, _) = broadcast::channel(16);
        let (reading_tx, _) = broadcast::channel(64);

        Self {
            alert_tx,
            reading_tx,
        }
    }

    /// Subscribe to alerts.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertEvent> {
        self.alert_tx.subscribe()
    }

    /// Subscribe to readings.
    pub fn subscribe_readings(&self) -> broadcast::Receiver<ReadingUpdate> {
        self.reading_tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for BroadcastSink {
    fn deliver(&self, alert: AlertEvent) {
        if self.alert_tx.send(alert).is_err() {
            trace!("No alert subscribers");
        }
    }
}

impl DataSink for BroadcastSink {
    fn publish(&self, temperature: Temperature, preference: DisplayPreference) {
        let update = ReadingUpdate {
            temperature,
            preference,
        };
        if self.reading_tx.send(update).is_err() {
            trace!("No reading subscribers");
        }
    }
}
