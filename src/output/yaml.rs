//! YAML formatter.
//!
//! The stream is a single document (`---` header) holding a sequence with
//! one mapping per record. Free-text values are double quoted; none of them
//! can contain a quote or a backslash.

use super::{HexBytes, OutputFormatter, RECORD_CAPACITY, format_timestamp};
use crate::advertisement::AdvertisementReport;
use crate::classifier::Classification;
use std::fmt::Write;
use time::OffsetDateTime;

pub const YAML_DOCUMENT_START: &str = "---\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFormatter;

impl OutputFormatter for YamlFormatter {
    fn header(&self) -> Option<&'static str> {
        Some(YAML_DOCUMENT_START)
    }

    fn format(
        &self,
        classification: &Classification<'_>,
        report: &AdvertisementReport,
        timestamp: OffsetDateTime,
    ) -> String {
        let mut record = String::with_capacity(RECORD_CAPACITY);
        let _ = writeln!(record, "- time: \"{}\"", format_timestamp(timestamp));
        let _ = writeln!(record, "  manufacturer: {}", classification.manufacturer);
        let _ = writeln!(record, "  type: \"{}\"", classification.device_type);
        let _ = writeln!(record, "  address: \"{}\"", report.address);
        let _ = writeln!(record, "  rssi: {}", report.rssi);
        let _ = writeln!(record, "  adv_type: {}", report.adv_type);
        let _ = writeln!(record, "  connectable: {}", report.connectable);
        let _ = writeln!(record, "  scannable: {}", report.scannable);
        let _ = writeln!(record, "  data_type: {}", classification.source);
        let _ = writeln!(record, "  data_hex: \"{}\"", HexBytes(classification.data));
        record
    }
}
