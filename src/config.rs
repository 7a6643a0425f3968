//! Application-wide constants and compile-time configuration.
//!
//! All protocol identifiers, timing parameters, and capacity bounds
//! live here so they can be tuned in one place.

// Button service

/// 128-bit UUID of the button service, canonical form.
///
/// The same literal must be flashed on both boards; there is no
/// runtime negotiation, a mismatch simply never pairs.
pub const BUTTON_SERVICE_UUID: u128 = 0xBDFC9792_8234_405E_AE02_35EF4174B299;

/// Button service UUID as it appears on the wire in advertisement
/// 128-bit UUID list records (little-endian byte order).
pub const BUTTON_SERVICE_UUID_LE: [u8; 16] = [
    0x99, 0xB2, 0x74, 0x41, 0xEF, 0x35, 0x02, 0xAE, //
    0x5E, 0x40, 0x34, 0x82, 0x92, 0x97, 0xFC, 0xBD,
];

/// Number of button/LED channels, equal to the characteristic count of
/// the button service. Sizes the subscription table.
pub const CHANNEL_COUNT: usize = 4;

/// 16-bit UUID of the first button characteristic; channel `i` uses
/// `BUTTON_CHAR_UUID_FIRST + i`.
pub const BUTTON_CHAR_UUID_FIRST: u16 = 0x0001;

// BLE

/// Scan interval and window (in 0.625 ms units). Equal values keep the
/// receiver open continuously so advertisements are caught reliably.
pub const BLE_SCAN_INTERVAL: u16 = 0x0080;
pub const BLE_SCAN_WINDOW: u16 = 0x0080;

/// BLE connection interval range (in 1.25 ms units).
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// Scanner mode

/// Maximum number of payload bytes hex-dumped per scan log line.
pub const SCAN_LOG_MAX_BYTES: usize = 64;

// GPIO
//
// Pin assignments follow the nRF52840-DK: buttons on P0.11/P0.12/P0.24/P0.25
// (active-low with internal pull-up), LEDs on P0.13-P0.16 (active-low).
// Actual `embassy_nrf::peripherals::*` pins are selected in the binaries.

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;
