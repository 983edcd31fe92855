//! CSV formatter.
//!
//! None of the fields can contain a comma or a quote (labels come from fixed
//! tables, hex is space separated), so no quoting is needed.

use super::{HexBytes, OutputFormatter, RECORD_CAPACITY, format_timestamp};
use crate::advertisement::AdvertisementReport;
use crate::classifier::Classification;
use std::fmt::Write;
use time::OffsetDateTime;

pub const CSV_HEADER: &str =
    "time,manufacturer,deviceType,addr,rssi,advType,isConnectable,isScannable,dataType,dataHex\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn header(&self) -> Option<&'static str> {
        Some(CSV_HEADER)
    }

    fn format(
        &self,
        classification: &Classification<'_>,
        report: &AdvertisementReport,
        timestamp: OffsetDateTime,
    ) -> String {
        let mut row = String::with_capacity(RECORD_CAPACITY);
        let _ = writeln!(
            row,
            "{},{},{},{},{},{},{},{},{},{}",
            format_timestamp(timestamp),
            classification.manufacturer,
            classification.device_type,
            report.address,
            report.rssi,
            report.adv_type,
            report.connectable,
            report.scannable,
            classification.source,
            HexBytes(classification.data),
        );
        row
    }
}
