//! # medcooler-ble
//!
//! Monitors a MedCooler ESP32 temperature sensor over Bluetooth Low Energy
//! and raises rate-limited alerts when the cooler gets too warm.
//!
//! The crate connects to one fixed peripheral (`MedCooler_ESP32`), reads its
//! temperature characteristic every two seconds, and hands each reading to
//! a display sink and a threshold alerter. Crossing the threshold (7.78°C /
//! 46°F by default) raises a ringing alert; staying above it rings again
//! only after a 30 second cooldown.
//!
//! ## Features
//!
//! - **Connection lifecycle**: scan with timeout, connect, discover, poll,
//!   disconnect, all driven by one event-ordered state machine
//! - **Unit handling**: Celsius internally, display in either unit
//! - **Debounced alerts**: crossing detection with a cooldown gate
//! - **Pluggable transport**: `btleplug` out of the box, any [`Scanner`] +
//!   [`LinkTransport`] pair for other platforms or tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medcooler_ble::{BroadcastSink, BtleplugTransport, MonitorConfig, Orchestrator, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scanner = BtleplugTransport::new().await?;
//!     let transport = scanner.sibling();
//!     let sink = BroadcastSink::new();
//!     let mut readings = sink.subscribe_readings();
//!
//!     let (monitor, handle) = Orchestrator::new(
//!         scanner,
//!         transport,
//!         sink.clone(),
//!         sink,
//!         MonitorConfig::default(),
//!     )?;
//!     tokio::spawn(monitor.run());
//!
//!     handle.start_scan()?;
//!     while let Ok(reading) = readings.recv().await {
//!         println!("Temperature: {}", reading.display_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for config and data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod monitor;
pub mod sink;
pub mod utils;

// Re-exports for convenience
pub use ble::{
    BtleplugTransport, ConnectionEvent, ConnectionState, DeviceSession, LinkTransport,
    PeripheralIdentity, Scanner, MEDCOOLER,
};
pub use config::MonitorConfig;
pub use data::{
    AlertConfig, AlertEvent, AlertState, DisplayPreference, Temperature, TemperatureUnit,
    Threshold, ThresholdAlerter,
};
pub use error::{DecodeError, Error, Result};
pub use monitor::{MonitorCommand, MonitorHandle, Orchestrator};
pub use sink::{AlertSink, BroadcastSink, DataSink, ReadingUpdate};
pub use utils::{celsius_to_fahrenheit, fahrenheit_to_celsius};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<MonitorConfig>();
        let _ = std::any::TypeId::of::<ThresholdAlerter>();
        let _ = std::any::TypeId::of::<BroadcastSink>();
        let _ = std::any::TypeId::of::<MonitorHandle>();
        let _ = std::any::TypeId::of::<BtleplugTransport>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }
}
