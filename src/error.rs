//! Error types for the medcooler-ble crate.

use thiserror::Error;

use crate::ble::ConnectionState;

/// Failure to turn a characteristic payload into a temperature.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than the four bytes of an `f32` were supplied.
    #[error("payload too short: {len} bytes (need at least 4)")]
    TooShort {
        /// Length of the payload that was received.
        len: usize,
    },
}

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The platform scan could not be started or aborted.
    #[error("Scan failed: {reason}")]
    ScanFailed {
        /// Description of why the scan failed.
        reason: String,
    },

    /// Failed to establish a connection to the peripheral.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// Operation requires a link but none is open.
    #[error("Peripheral not connected")]
    NotConnected,

    /// The operation is not valid in the current connection state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the session was in.
        state: ConnectionState,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// A characteristic payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The monitor loop is no longer running.
    #[error("Monitor channel closed")]
    ChannelClosed,
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
