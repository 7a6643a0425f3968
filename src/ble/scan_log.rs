//! Scanner-mode log line formatting.
//!
//! One line per received advertisement: the decimal payload length,
//! a comma, then the payload as bare uppercase hex (two characters per
//! byte, capped at [`SCAN_LOG_MAX_BYTES`] bytes). A header line names
//! the columns once at startup.

use core::fmt::Write;

use heapless::String;

use crate::config::SCAN_LOG_MAX_BYTES;

/// One-time column header.
pub const SCAN_LOG_HEADER: &str = "len,payload";

/// Worst case: 3 digits of length + comma + 2 hex chars per dumped byte.
pub const SCAN_LOG_LINE_CAP: usize = 4 + 2 * SCAN_LOG_MAX_BYTES;

/// Format one advertisement payload as a log line.
pub fn format_report(data: &[u8]) -> String<SCAN_LOG_LINE_CAP> {
    let mut line = String::new();
    // Writes to a heapless String only fail on capacity, which the
    // constant above rules out.
    let _ = write!(&mut line, "{},", data.len());
    for byte in data.iter().take(SCAN_LOG_MAX_BYTES) {
        let _ = write!(&mut line, "{:02X}", byte);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_flags_only_payload() {
        let line = format_report(&[0x02, 0x01, 0x06]);
        assert_eq!(line.as_str(), "3,020106");
    }

    #[test]
    fn formats_empty_payload() {
        assert_eq!(format_report(&[]).as_str(), "0,");
    }

    #[test]
    fn hex_is_uppercase_and_zero_padded() {
        let line = format_report(&[0x00, 0x0A, 0xFF]);
        assert_eq!(line.as_str(), "3,000AFF");
    }

    #[test]
    fn payload_is_capped_at_64_bytes() {
        let data = [0xAB; 100];
        let line = format_report(&data);
        // Length reports the real payload size; the dump is truncated.
        assert!(line.as_str().starts_with("100,"));
        assert_eq!(line.len(), 4 + 2 * SCAN_LOG_MAX_BYTES);
    }

    #[test]
    fn header_matches_column_layout() {
        assert_eq!(SCAN_LOG_HEADER, "len,payload");
    }
}
