use crate::advertisement::{AdvType, AdvertisementReport};
use crate::mac_address::MacAddress;
use time::OffsetDateTime;
use time::macros::datetime;

/// A stable address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// A stable receive time for unit tests.
pub const TEST_TIMESTAMP: OffsetDateTime = datetime!(2025-01-15 14:03:07.250 UTC);

/// Build a non-connectable report with no data blocks.
///
/// Tests fill in just the data they care about.
pub fn base_report(rssi: i16) -> AdvertisementReport {
    AdvertisementReport::new(TEST_MAC, rssi, AdvType::NonConnInd)
}

/// An AirTag in separated state, as seen on the air.
pub fn airtag_report() -> AdvertisementReport {
    let mut report = base_report(-61);
    report.manufacturer_data = Some(vec![0x4C, 0x00, 0x12, 0x19, 0x10, 0xAA]);
    report
}
