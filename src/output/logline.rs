//! Human-readable log line formatter.
//!
//! `2025-01-15 14:03:07.250 | Apple FindMy/AirTag | AA:BB:CC:DD:EE:FF | RSSI -61 | PDU NONCONN | NONCONN | Manufacturer [4C 00 12 19]`

use super::{HexBytes, OutputFormatter, RECORD_CAPACITY, format_timestamp};
use crate::advertisement::AdvertisementReport;
use crate::classifier::Classification;
use std::fmt::Write;
use time::OffsetDateTime;

/// Pipe-separated log line formatter.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFormatter;

impl OutputFormatter for LogFormatter {
    fn format(
        &self,
        classification: &Classification<'_>,
        report: &AdvertisementReport,
        timestamp: OffsetDateTime,
    ) -> String {
        let mut line = String::with_capacity(RECORD_CAPACITY);
        let _ = writeln!(
            line,
            "{} | {} {} | {} | RSSI {:03} | PDU {} | {}{} | {} [{}]",
            format_timestamp(timestamp),
            classification.manufacturer,
            classification.device_type,
            report.address,
            report.rssi,
            report.adv_type,
            if report.connectable { "CONN" } else { "NONCONN" },
            if report.scannable { "/SCAN" } else { "" },
            classification.source,
            HexBytes(classification.data),
        );
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::{AdvType, ServiceData};
    use crate::classifier::classify;
    use crate::filter::FilterConfig;
    use crate::test_utils::{TEST_TIMESTAMP, airtag_report, base_report};

    #[test]
    fn test_manufacturer_record() {
        let report = airtag_report();
        let found = classify(&report, &FilterConfig::default()).unwrap();

        assert_eq!(
            LogFormatter.format(&found, &report, TEST_TIMESTAMP),
            "2025-01-15 14:03:07.250 | Apple FindMy/AirTag | AA:BB:CC:DD:EE:FF | RSSI -61 | PDU NONCONN | NONCONN | Manufacturer [4C 00 12 19 10 AA]\n"
        );
    }

    #[test]
    fn test_service_record_connectable_scannable() {
        let mut report = base_report(-45);
        report.adv_type = AdvType::Ind;
        report.connectable = true;
        report.scannable = true;
        report.service_data = vec![ServiceData::new(0xFEF3, [0x11, 0x0a, 0xb0])];
        let found = classify(&report, &FilterConfig::default()).unwrap();

        assert_eq!(
            LogFormatter.format(&found, &report, TEST_TIMESTAMP),
            "2025-01-15 14:03:07.250 | Google FastPair/FindDevice | AA:BB:CC:DD:EE:FF | RSSI -45 | PDU ADV_IND | CONN/SCAN | Service [11 0A B0]\n"
        );
    }

    #[test]
    fn test_rssi_zero_padding() {
        let mut report = airtag_report();
        report.rssi = -5;
        let config = FilterConfig::new(-100, Default::default());
        let found = classify(&report, &config).unwrap();
        assert!(LogFormatter.format(&found, &report, TEST_TIMESTAMP).contains("| RSSI -05 |"));

        report.rssi = 7;
        let found = classify(&report, &config).unwrap();
        assert!(LogFormatter.format(&found, &report, TEST_TIMESTAMP).contains("| RSSI 007 |"));

        report.rssi = -100;
        let found = classify(&report, &config).unwrap();
        assert!(LogFormatter.format(&found, &report, TEST_TIMESTAMP).contains("| RSSI -100 |"));
    }

    #[test]
    fn test_scannable_only() {
        let mut report = airtag_report();
        report.adv_type = AdvType::ScanInd;
        report.connectable = false;
        report.scannable = true;
        let found = classify(&report, &FilterConfig::default()).unwrap();

        assert!(
            LogFormatter
                .format(&found, &report, TEST_TIMESTAMP)
                .contains("| PDU SCAN_IND | NONCONN/SCAN |")
        );
    }
}
