//! Service-data decoder.

use super::DeviceMatch;
use crate::registry::{
    APPLE_FIND_MY_UUID, GOOGLE_FAST_PAIR_UUID, Manufacturer, SAMSUNG_FIND_UUID,
    service_uuid_to_company,
};

/// Fast Pair frame announcing a Find My Device capable accessory.
const FAST_PAIR_FIND_DEVICE: u8 = 0x11;
const FAST_PAIR_GENERIC: u8 = 0x10;

/// Minimum payload length per service UUID.
fn min_len(uuid: u16) -> Option<usize> {
    match uuid {
        GOOGLE_FAST_PAIR_UUID => Some(3),
        APPLE_FIND_MY_UUID => Some(6),
        SAMSUNG_FIND_UUID => Some(4),
        _ => None,
    }
}

/// Recognize a service-data entry.
///
/// Returns `None` for unknown UUIDs and for payloads below the per-UUID floor.
pub fn try_decode(uuid: u16, data: &[u8]) -> Option<DeviceMatch> {
    let manufacturer = service_uuid_to_company(uuid)?;
    if data.len() < min_len(uuid)? {
        return None;
    }

    let device_type = match manufacturer {
        Manufacturer::Google => match data[0] {
            FAST_PAIR_FIND_DEVICE => "FastPair/FindDevice",
            FAST_PAIR_GENERIC => "FastPair/Generic",
            _ => "FastPair/Unknown",
        },
        Manufacturer::Apple => "FindMy/Service",
        Manufacturer::Samsung => "SmartTag/Service",
        Manufacturer::Xiaomi | Manufacturer::Other => return None,
    };

    Some(DeviceMatch::new(manufacturer, device_type))
}
