//! BLE Service and Characteristic UUIDs.
//!
//! Identity of the single peripheral this crate talks to.

use uuid::Uuid;

/// Advertised local name of the MedCooler sensor.
pub const MEDCOOLER_DEVICE_NAME: &str = "MedCooler_ESP32";

/// MedCooler temperature service UUID.
pub const TEMPERATURE_SERVICE_UUID: Uuid = Uuid::from_u128(0x1a5daf34_d0d9_4ee9_b8cd_c773aa936bb6);

/// MedCooler temperature characteristic UUID (Read). Holds a little-endian `f32` in Celsius.
pub const TEMPERATURE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xcba1d466_344c_4be3_ab3f_189f80dd7518);

/// Fixed identity used to filter scan results and locate the characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralIdentity {
    /// Advertised device name.
    pub name: &'static str,
    /// Service that carries the characteristic.
    pub service: Uuid,
    /// Characteristic polled for temperature.
    pub characteristic: Uuid,
}

/// The MedCooler sensor.
pub const MEDCOOLER: PeripheralIdentity = PeripheralIdentity {
    name: MEDCOOLER_DEVICE_NAME,
    service: TEMPERATURE_SERVICE_UUID,
    characteristic: TEMPERATURE_CHARACTERISTIC_UUID,
};

impl PeripheralIdentity {
    /// Check whether an advertised name belongs to this peripheral.
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        name == Some(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            TEMPERATURE_SERVICE_UUID.to_string(),
            "1a5daf34-d0d9-4ee9-b8cd-c773aa936bb6"
        );
        assert_eq!(
            TEMPERATURE_CHARACTERISTIC_UUID.to_string(),
            "cba1d466-344c-4be3-ab3f-189f80dd7518"
        );
    }

    #[test]
    fn test_matches_name() {
        assert!(MEDCOOLER.matches_name(Some("MedCooler_ESP32")));
        assert!(!MEDCOOLER.matches_name(Some("MedCooler_ESP32 ")));
        assert!(!MEDCOOLER.matches_name(Some("medcooler_esp32")));
        assert!(!MEDCOOLER.matches_name(None));
    }
}
