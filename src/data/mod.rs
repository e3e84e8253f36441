//! Data structures for sensor readings.
//!
//! This module contains temperature decoding, display preferences and the
//! threshold alarm debouncer.

pub mod alarms;
pub mod preferences;
pub mod temperature;

pub use alarms::{AlertConfig, AlertEvent, AlertState, Threshold, ThresholdAlerter};
pub use preferences::DisplayPreference;
pub use temperature::{
    decode_temperature, format_alert, format_display, RawReading, Temperature, TemperatureUnit,
};
