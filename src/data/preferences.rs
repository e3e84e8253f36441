//! User display preferences.

use crate::data::temperature::TemperatureUnit;

/// Which unit readings and alerts are rendered in.
///
/// Owned by the orchestrator. A change applies to the next reading; values
/// that were already published are not touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayPreference {
    /// Whether temperatures are shown in Celsius.
    pub is_celsius: bool,
}

impl DisplayPreference {
    /// Create a preference for `unit`.
    pub fn new(unit: TemperatureUnit) -> Self {
        Self {
            is_celsius: unit == TemperatureUnit::Celsius,
        }
    }

    /// The selected unit.
    pub fn unit(&self) -> TemperatureUnit {
        if self.is_celsius {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        }
    }

    /// Switch to the other unit and return the new one.
    pub fn toggle(&mut self) -> TemperatureUnit {
        self.is_celsius = !self.is_celsius;
        self.unit()
    }
}

impl Default for DisplayPreference {
    fn default() -> Self {
        Self { is_celsius: true }
    }
}
