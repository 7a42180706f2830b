// Protocol constants for the FDS altimeter

/// Adafruit vendor id used by the altimeter's USB stack
pub const VID: u16 = 0x239A;

/// Interface class of the serial data interface
pub const VENDOR_INTERFACE_CLASS: u8 = 0xFF;

/// CDC SET_CONTROL_LINE_STATE request
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;

/// Bytes requested per bulk IN transfer (endpoint packet size)
pub const READ_CHUNK_SIZE: usize = 64;

/// Sent after connecting; the device answers with its full settings dump
pub const REQUEST_SETTINGS: &str = "-";

/// Number of preset slots on the device
pub const PRESET_COUNT: usize = 3;

/// Wire digit for preset index 0 in notification messages
pub const PRESET_DIGIT_OFFSET: u8 = 2;

/// Extra notification registered when the device ends a dump with `end-settings`
pub const ALTITUDE_NOTIFICATION: &str = "(Altitude)";

/// Digits in a notification trigger altitude
pub const NOTIFICATION_ALTITUDE_WIDTH: usize = 5;

/// Digits in a dropzone offset value (after the sign)
pub const DROPZONE_OFFSET_WIDTH: usize = 5;

/// Digits in a freefall threshold value
pub const FREEFALL_THRESHOLD_WIDTH: usize = 3;

pub const MAX_ALTITUDE: u32 = 30_000;

pub const MIN_VOLUME: u8 = 1;

pub const MAX_VOLUME: u8 = 10;

pub const MAX_FREEFALL_THRESHOLD: u16 = 999;

pub const MAX_DROPZONE_OFFSET: i32 = 99_999;

pub const MAX_NOTIFICATION_ALTITUDE: u32 = 99_999;

/// Altitude intervals (feet) the device can announce at
pub const ANNOUNCEMENT_FREQUENCIES: [u16; 6] = [100, 200, 500, 1000, 2000, 5000];
