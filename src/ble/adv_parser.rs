use heapless::String;

use crate::light::protocol::{uuid_le, SERVICE_UUID};

/// AD types carrying 128-bit service UUID lists (incomplete, complete).
const AD_UUID128_INCOMPLETE: u8 = 0x06;
const AD_UUID128_COMPLETE: u8 = 0x07;

/// AD types carrying a local name (shortened, complete).
const AD_NAME_SHORT: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;

/// Check if raw advertisement data lists the SNL660 service UUID.
///
/// Both byte orders are accepted; some firmware revisions advertise the
/// UUID byte-swapped.
pub fn contains_snl660_service_uuid(data: &[u8]) -> bool {
    let canonical = uuid_le(&SERVICE_UUID);
    let swapped = SERVICE_UUID;

    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == AD_UUID128_INCOMPLETE || ad_type == AD_UUID128_COMPLETE {
            let uuid_data = &data[i + 2..i + 1 + len];
            for chunk in uuid_data.chunks_exact(16) {
                if chunk == canonical || chunk == swapped {
                    return true;
                }
            }
        }
        i += len + 1;
    }
    false
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == AD_NAME_SHORT || ad_type == AD_NAME_COMPLETE {
            let name_bytes = &data[i + 2..i + 1 + len];
            let mut name = String::new();
            for &b in name_bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
            return name;
        }
        i += len + 1;
    }

    let mut s = String::new();
    let _ = s.push_str("Unknown");
    s
}
