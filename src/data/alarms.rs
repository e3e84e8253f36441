//! High temperature alarm handling.
//!
//! [`ThresholdAlerter`] is a two-state (above/below) debouncer with a
//! cooldown gate. A crossing from at-or-below to above the threshold always
//! rings; while the temperature stays above, it rings again only once the
//! cooldown has elapsed since the last alert.

use std::time::Duration;
use tracing::{debug, info};

use crate::data::temperature::{format_alert, TemperatureUnit};

/// Default alarm threshold in Celsius (46°F).
pub const DEFAULT_THRESHOLD_CELSIUS: f64 = 7.78;

/// Default alarm threshold in Fahrenheit.
pub const DEFAULT_THRESHOLD_FAHRENHEIT: f64 = 46.0;

/// Default minimum time between ringing alerts.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Title shown on every alert notification.
pub const ALERT_TITLE: &str = "High Temperature Warning!";

/// Alarm threshold, expressed separately in each display unit.
///
/// A reading is always compared against the threshold of the unit it was
/// converted to, so Celsius values never meet the Fahrenheit limit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Threshold {
    /// Limit in degrees Celsius.
    pub celsius: f64,
    /// Limit in degrees Fahrenheit.
    pub fahrenheit: f64,
}

impl Threshold {
    /// Build a threshold from a Celsius limit.
    pub fn from_celsius(celsius: f64) -> Self {
        Self {
            celsius,
            fahrenheit: crate::utils::celsius_to_fahrenheit(celsius),
        }
    }

    /// The limit for `unit`.
    pub fn in_unit(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.celsius,
            TemperatureUnit::Fahrenheit => self.fahrenheit,
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            celsius: DEFAULT_THRESHOLD_CELSIUS,
            fahrenheit: DEFAULT_THRESHOLD_FAHRENHEIT,
        }
    }
}

/// Alerter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertConfig {
    /// Temperature above which alerts are raised.
    pub threshold: Threshold,
    /// Minimum time between ringing alerts while above threshold.
    pub cooldown: Duration,
    /// Also emit silent alerts for above-threshold readings inside the
    /// cooldown window.
    pub visible_updates: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            cooldown: DEFAULT_COOLDOWN,
            visible_updates: false,
        }
    }
}

/// Debouncer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertState {
    /// Whether the last reading was above threshold.
    pub is_above_threshold: bool,
    /// Time of the last emitted alert, in milliseconds.
    pub last_alert_time_millis: i64,
}

/// An alert to hand to the notification layer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertEvent {
    /// Temperature in `unit`.
    pub temperature: f64,
    /// Unit in effect when the alert was raised.
    pub unit: TemperatureUnit,
    /// Whether the alert should sound/vibrate, as opposed to only updating
    /// the visible notification.
    pub should_ring: bool,
    /// When the alert was raised, in milliseconds.
    pub timestamp_millis: i64,
}

impl AlertEvent {
    /// Notification title.
    pub fn title(&self) -> &'static str {
        ALERT_TITLE
    }

    /// Notification body, e.g. `"Temperature is 8.2°C"`.
    pub fn message(&self) -> String {
        format!("Temperature is {}", format_alert(self.temperature, self.unit))
    }
}

/// Decides, reading by reading, whether to raise an alert.
#[derive(Debug, Clone, Default)]
pub struct ThresholdAlerter {
    config: AlertConfig,
    state: AlertState,
}

impl ThresholdAlerter {
    /// Create an alerter with `config` and a fresh state.
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            state: AlertState::default(),
        }
    }

    /// Current debouncer state.
    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Feed one reading.
    ///
    /// `temp_celsius` is converted to `unit` and compared against the
    /// threshold for that same unit.
    pub fn handle_reading(
        &mut self,
        temp_celsius: f64,
        now_millis: i64,
        unit: TemperatureUnit,
    ) -> Option<AlertEvent> {
        let current = unit.convert(temp_celsius);
        let threshold = self.config.threshold.in_unit(unit);

        // NaN compares false and counts as not above.
        let above = current > threshold;
        if !above {
            if self.state.is_above_threshold {
                debug!("Temperature back below threshold: {:.2}{}", current, unit);
            }
            self.state.is_above_threshold = false;
            return None;
        }

        let is_new_crossing = !self.state.is_above_threshold;
        let cooldown_expired = now_millis.saturating_sub(self.state.last_alert_time_millis)
            > self.config.cooldown.as_millis() as i64;
        let should_ring = is_new_crossing || cooldown_expired;

        self.state.is_above_threshold = true;

        if should_ring {
            info!(
                "Temperature {:.2}{} above threshold {:.2}{} (new crossing: {})",
                current, unit, threshold, unit, is_new_crossing
            );
            self.state.last_alert_time_millis = now_millis;
        } else if !self.config.visible_updates {
            return None;
        }

        Some(AlertEvent {
            temperature: current,
            unit,
            should_ring,
            timestamp_millis: now_millis,
        })
    }
}
