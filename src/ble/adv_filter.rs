//! Advertisement payload filter.
//!
//! Raw advertisement data is a sequence of TLV records
//! `[len][type][len-1 value bytes]`. The central only cares about one
//! question: does any 128-bit service UUID list record contain the
//! button service UUID? Malformed data degrades to "no match", never
//! to an error.

/// Incomplete list of 128-bit service UUIDs.
const AD_TYPE_UUID128_SOME: u8 = 0x06;
/// Complete list of 128-bit service UUIDs.
const AD_TYPE_UUID128_ALL: u8 = 0x07;

/// Check if raw advertisement data contains the given 128-bit service
/// UUID (little-endian wire form).
///
/// A zero-length record or a record whose declared length runs past
/// the end of the buffer stops the scan; a UUID list record whose tail
/// is shorter than 16 bytes is searched only over its full strides.
pub fn contains_service_uuid(data: &[u8], target: &[u8; 16]) -> bool {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == AD_TYPE_UUID128_SOME || ad_type == AD_TYPE_UUID128_ALL {
            let uuid_data = &data[i + 2..i + 1 + len];
            for chunk in uuid_data.chunks_exact(16) {
                if chunk == target {
                    return true;
                }
            }
        }
        i += len + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUTTON_SERVICE_UUID_LE;

    fn record(ad_type: u8, value: &[u8]) -> heapless::Vec<u8, 64> {
        let mut v = heapless::Vec::new();
        v.push((value.len() + 1) as u8).unwrap();
        v.push(ad_type).unwrap();
        v.extend_from_slice(value).unwrap();
        v
    }

    #[test]
    fn detect_service_uuid_in_complete_list() {
        let ad = record(0x07, &BUTTON_SERVICE_UUID_LE);
        assert!(contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn detect_service_uuid_in_incomplete_list() {
        let ad = record(0x06, &BUTTON_SERVICE_UUID_LE);
        assert!(contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn detect_service_uuid_after_flags_record() {
        // Flags record first, then the UUID list (the peripheral's
        // actual advertisement layout).
        let mut ad: heapless::Vec<u8, 64> = heapless::Vec::new();
        ad.extend_from_slice(&[0x02, 0x01, 0x06]).unwrap();
        ad.extend_from_slice(&record(0x07, &BUTTON_SERVICE_UUID_LE))
            .unwrap();
        assert!(contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn detect_service_uuid_in_second_stride() {
        let mut value = [0u8; 32];
        value[16..].copy_from_slice(&BUTTON_SERVICE_UUID_LE);
        let ad = record(0x07, &value);
        assert!(contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn other_uuid_does_not_match() {
        let mut other = BUTTON_SERVICE_UUID_LE;
        other[0] ^= 0xFF;
        let ad = record(0x07, &other);
        assert!(!contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn non_uuid_records_are_skipped() {
        // Flags + complete local name only.
        let ad = [0x02, 0x01, 0x06, 0x05, 0x09, b'b', b't', b'n', b's'];
        assert!(!contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn empty_payload() {
        assert!(!contains_service_uuid(&[], &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn zero_length_record_stops_scan() {
        let mut ad: heapless::Vec<u8, 64> = heapless::Vec::new();
        ad.push(0x00).unwrap();
        ad.extend_from_slice(&record(0x07, &BUTTON_SERVICE_UUID_LE))
            .unwrap();
        assert!(!contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn truncated_record_stops_scan() {
        // Declared length 0x14 but only 4 bytes follow.
        let ad = [0x14, 0x07, 0x99, 0xB2, 0x74, 0x41];
        assert!(!contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }

    #[test]
    fn partial_uuid_stride_is_ignored() {
        // 20-byte value: one full stride (wrong UUID) plus a 4-byte
        // tail that happens to be a prefix of the target.
        let mut value = [0u8; 20];
        value[..16].copy_from_slice(&{
            let mut other = BUTTON_SERVICE_UUID_LE;
            other[15] ^= 0xFF;
            other
        });
        value[16..].copy_from_slice(&BUTTON_SERVICE_UUID_LE[..4]);
        let ad = record(0x07, &value);
        assert!(!contains_service_uuid(&ad, &BUTTON_SERVICE_UUID_LE));
    }
}
