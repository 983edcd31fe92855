//! Manufacturer-specific data decoder.
//!
//! Layout: `[company id lo] [company id hi] [subtype] [vendor bytes...]`.

use super::DeviceMatch;
use crate::registry::Manufacturer;

/// Company id plus one subtype byte.
pub const MIN_LEN: usize = 3;

/// Apple and Samsung need at least one byte past the subtype.
const MIN_LEN_EXTENDED: usize = 4;

/// Recognize a manufacturer-data block (bytes include the company id).
pub fn try_decode(data: &[u8]) -> Option<DeviceMatch> {
    if data.len() < MIN_LEN {
        return None;
    }

    let company_id = u16::from_le_bytes([data[0], data[1]]);
    let subtype = data[2];

    let manufacturer = Manufacturer::from_company_id(company_id);
    let device_type = match manufacturer {
        Manufacturer::Apple if data.len() >= MIN_LEN_EXTENDED => match subtype {
            0x12 => "FindMy/AirTag",
            0x10 => "FindMy/Offline",
            _ => "FindMy/Other",
        },
        Manufacturer::Google => match subtype {
            0x06 => "FastPair/FindMy",
            _ => "FindMy/Other",
        },
        Manufacturer::Samsung if data.len() >= MIN_LEN_EXTENDED => match subtype {
            0x01 => "SmartTag",
            0x02 => "SmartTag+",
            _ => "SmartTag/Other",
        },
        Manufacturer::Xiaomi => match subtype {
            0x30 => "Anti-Lost",
            _ => "FindMy/Other",
        },
        _ => return None,
    };

    Some(DeviceMatch::new(manufacturer, device_type))
}
