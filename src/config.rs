//! Monitor configuration.
//!
//! Peripheral identity is fixed (see [`MEDCOOLER`](crate::ble::MEDCOOLER));
//! only timings and alarm behaviour can be tuned.

use std::time::Duration;

use crate::ble::scheduler::DEFAULT_POLL_INTERVAL;
use crate::data::alarms::{AlertConfig, Threshold};
use crate::error::{Error, Result};

/// Default time to look for the peripheral before giving up.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for a [`DeviceSession`](crate::ble::DeviceSession) and the
/// [`Orchestrator`](crate::Orchestrator) around it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorConfig {
    /// How long a scan runs before returning to idle.
    pub scan_timeout: Duration,
    /// Interval between characteristic reads while connected.
    pub poll_interval: Duration,
    /// Threshold alarm settings.
    pub alert: AlertConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            alert: AlertConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the alarm threshold from a Celsius limit.
    pub fn with_threshold_celsius(mut self, celsius: f64) -> Self {
        self.alert.threshold = Threshold::from_celsius(celsius);
        self
    }

    /// Set the cooldown between ringing alerts.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.alert.cooldown = cooldown;
        self
    }

    /// Emit silent alerts between ringing ones.
    pub fn with_visible_updates(mut self, enabled: bool) -> Self {
        self.alert.visible_updates = enabled;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a zero scan timeout or poll
    /// interval, or a non-finite threshold.
    pub fn validate(&self) -> Result<()> {
        if self.scan_timeout.is_zero() {
            return Err(invalid("scan_timeout", self.scan_timeout));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("poll_interval", self.poll_interval));
        }
        let threshold = self.alert.threshold;
        if !threshold.celsius.is_finite() || !threshold.fahrenheit.is_finite() {
            return Err(invalid("threshold", threshold));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl std::fmt::Debug) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        value: format!("{:?}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.scan_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.alert.cooldown, Duration::from_secs(30));
        assert_eq!(config.alert.threshold.celsius, 7.78);
        assert_eq!(config.alert.threshold.fahrenheit, 46.0);
        assert!(!config.alert.visible_updates);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::new()
            .with_scan_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(500))
            .with_threshold_celsius(100.0)
            .with_cooldown(Duration::from_secs(1))
            .with_visible_updates(true);

        assert_eq!(config.scan_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.alert.threshold.fahrenheit, 212.0);
        assert_eq!(config.alert.cooldown, Duration::from_secs(1));
        assert!(config.alert.visible_updates);
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let err = assert_err!(MonitorConfig::new()
            .with_poll_interval(Duration::ZERO)
            .validate());
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "poll_interval"));

        assert_err!(MonitorConfig::new()
            .with_scan_timeout(Duration::ZERO)
            .validate());
    }

    #[test]
    fn test_validate_rejects_nan_threshold() {
        assert_err!(MonitorConfig::new()
            .with_threshold_celsius(f64::NAN)
            .validate());
    }
}
