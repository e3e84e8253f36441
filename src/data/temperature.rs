//! Temperature data structures.
//!
//! Converts raw characteristic payloads into temperatures and formats them
//! for the display and alert surfaces.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::DecodeError;
use crate::utils::celsius_to_fahrenheit;

/// Unit a temperature is shown and compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Unit suffix used in display and alert text.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Express a Celsius value in this unit.
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    /// The other unit.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One characteristic read result.
///
/// Consumed by [`decode_temperature`] and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReading {
    /// Payload bytes as returned by the peripheral.
    pub data: Vec<u8>,
    /// When the read completed.
    pub received_at: DateTime<Utc>,
}

impl RawReading {
    /// Wrap a payload received now.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            received_at: Utc::now(),
        }
    }
}

/// A decoded temperature, always held in Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Temperature {
    /// Temperature in degrees Celsius.
    pub celsius: f64,
    /// Timestamp of the read this value came from.
    pub timestamp: DateTime<Utc>,
}

impl Temperature {
    /// Create a temperature taken at `timestamp`.
    pub fn new(celsius: f64, timestamp: DateTime<Utc>) -> Self {
        Self { celsius, timestamp }
    }

    /// Temperature in degrees Fahrenheit.
    pub fn fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.celsius)
    }

    /// Value expressed in `unit`.
    pub fn value_in(&self, unit: TemperatureUnit) -> f64 {
        unit.convert(self.celsius)
    }

    /// Display text in `unit`, two decimal places (e.g. `"4.25°C"`).
    pub fn display(&self, unit: TemperatureUnit) -> String {
        format_display(self.value_in(unit), unit)
    }
}

/// Decode a characteristic payload.
///
/// The first four bytes are a little-endian IEEE-754 `f32` in Celsius;
/// any trailing bytes are ignored.
///
/// # Example
///
/// ```
/// use medcooler_ble::data::decode_temperature;
///
/// let temp = decode_temperature(&4.5f32.to_le_bytes(), chrono::Utc::now()).unwrap();
/// assert_eq!(temp.celsius, 4.5);
/// ```
pub fn decode_temperature(
    bytes: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Temperature, DecodeError> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(DecodeError::TooShort { len: bytes.len() })?;

    Ok(Temperature::new(f32::from_le_bytes(raw) as f64, timestamp))
}

/// Format a value for the live display: two decimals plus unit.
pub fn format_display(value: f64, unit: TemperatureUnit) -> String {
    format!("{:.2}{}", value, unit.symbol())
}

/// Format a value for alert text: one decimal plus unit.
pub fn format_alert(value: f64, unit: TemperatureUnit) -> String {
    format!("{:.1}{}", value, unit.symbol())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_little_endian() {
        let temp = decode_temperature(&[0x00, 0x00, 0x90, 0x40], Utc::now()).unwrap();
        assert_eq!(temp.celsius, 4.5);
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            decode_temperature(&[0x00, 0x00, 0x90], Utc::now()),
            Err(DecodeError::TooShort { len: 3 })
        );
        assert_eq!(
            decode_temperature(&[], Utc::now()),
            Err(DecodeError::TooShort { len: 0 })
        );
    }

    #[test]
    fn test_decode_keeps_timestamp() {
        let at = Utc::now();
        let temp = decode_temperature(&1.0f32.to_le_bytes(), at).unwrap();
        assert_eq!(temp.timestamp, at);
    }

    #[test]
    fn test_format_contracts() {
        assert_eq!(format_display(8.0, TemperatureUnit::Celsius), "8.00°C");
        assert_eq!(format_alert(46.44, TemperatureUnit::Fahrenheit), "46.4°F");
    }

    #[test]
    fn test_display_in_fahrenheit() {
        let temp = Temperature::new(100.0, Utc::now());
        assert_eq!(temp.display(TemperatureUnit::Fahrenheit), "212.00°F");
        assert_eq!(temp.display(TemperatureUnit::Celsius), "100.00°C");
    }

    #[test]
    fn test_unit_toggle() {
        assert_eq!(TemperatureUnit::Celsius.toggled(), TemperatureUnit::Fahrenheit);
        assert_eq!(TemperatureUnit::Fahrenheit.toggled(), TemperatureUnit::Celsius);
    }

    proptest! {
        #[test]
        fn short_payloads_are_rejected(bytes in proptest::collection::vec(any::<u8>(), 0..4)) {
            let len = bytes.len();
            prop_assert_eq!(
                decode_temperature(&bytes, Utc::now()),
                Err(DecodeError::TooShort { len })
            );
        }

        #[test]
        fn only_first_four_bytes_are_used(
            value in -100.0f32..100.0,
            tail in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let mut bytes = value.to_le_bytes().to_vec();
            bytes.extend_from_slice(&tail);
            let temp = decode_temperature(&bytes, Utc::now()).unwrap();
            prop_assert_eq!(temp.celsius, value as f64);
        }
    }
}
