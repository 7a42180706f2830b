use nusb::descriptors::ActiveConfigurationError;
use nusb::transfer::TransferError;
use std::io;
use thiserror::Error;

/// The primary error type for the `fds-lib` library.
#[derive(Error, Debug)]
pub enum FdsError {
    #[error("USB device not found. Is the altimeter connected?")]
    DeviceNotFound,

    #[error("Device exposes no vendor-specific (0xff) interface")]
    NoVendorInterface,

    /// nusb 0.1 reports host errors as `std::io::Error`, so these are mapped
    /// explicitly to keep them apart from file I/O.
    #[error("USB error: {0}")]
    Usb(nusb::Error),

    #[error("Failed to read active USB configuration: {0}")]
    Configuration(#[from] ActiveConfigurationError),

    #[error("USB transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Timeout during USB operation: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Settings document error: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation or stage character outside the protocol alphabet.
    #[error("Protocol grammar violation: invalid {what} '{found}'")]
    Grammar { what: &'static str, found: char },

    #[error("Malformed {field} message: {message}")]
    Malformed { field: String, message: String },

    #[error("{0} cannot be sent from host to device")]
    Unencodable(&'static str),

    #[error("Value {value} does not fit the {width}-digit field '{tag}'")]
    ValueTooWide { tag: char, value: i64, width: usize },

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Announcement frequency {0} is not one of the supported intervals")]
    UnsupportedFrequency(u32),

    #[error("Altitude band is inverted: from {from} ft is above to {to} ft")]
    InvertedAltitudeBand { from: u32, to: u32 },

    #[error("Unknown notification '{0}'")]
    UnknownNotification(String),

    #[error("Preset index {0} out of bounds (expected 0..=2)")]
    InvalidPresetIndex(usize),

    #[error("Device disconnected")]
    Disconnected,
}
