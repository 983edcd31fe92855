//! Core application runner (business logic) for `findmy-scanner`.
//!
//! This module is intentionally decoupled from CLI parsing and process exit codes
//! so it can be tested deterministically: the radio and the wall clock are
//! both injected.

use crate::advertisement::AdvertisementReport;
use crate::classifier::classify;
use crate::filter::{DEFAULT_MIN_RSSI, FilterConfig};
use crate::output::{OutputFormat, render};
use crate::registry::ManufacturerMask;
use crate::scanner::{
    Backend, DEFAULT_SCAN_INTERVAL, DEFAULT_SCAN_WINDOW, ScanError, ScanParameters,
};
use clap::Parser;
use log::{debug, info, trace};
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Record layout written to stdout
    #[arg(long, default_value_t, value_enum)]
    pub format: OutputFormat,

    /// Drop advertisements weaker than this (dBm, inclusive)
    #[arg(long, default_value_t = DEFAULT_MIN_RSSI, allow_negative_numbers = true)]
    pub min_rssi: i16,

    /// Enabled manufacturers: bit0 Apple, bit1 Google, bit2 Samsung, bit3 Xiaomi.
    /// Accepts hex (0xF) or decimal (15).
    #[arg(long, default_value = "0xF", value_parser = crate::registry::parse_mask)]
    pub manufacturer_mask: ManufacturerMask,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,

    /// Passive scan: do not request scan responses
    #[arg(long)]
    pub passive: bool,

    /// Scan interval in 0.625 ms units
    #[arg(long, default_value_t = DEFAULT_SCAN_INTERVAL)]
    pub scan_interval: u16,

    /// Scan window in 0.625 ms units, at most the interval
    #[arg(long, default_value_t = DEFAULT_SCAN_WINDOW)]
    pub scan_window: u16,

    /// HCI device index (hci0 = 0), used by the hci backend
    #[arg(long, default_value_t = 0)]
    pub adapter: u16,

    /// Verbose output, log debug diagnostics to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Options {
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig::new(self.min_rssi, self.manufacturer_mask)
    }

    pub fn scan_parameters(&self) -> ScanParameters {
        ScanParameters {
            active: !self.passive,
            interval: self.scan_interval,
            window: self.scan_window,
            adapter: self.adapter,
        }
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
        backend: Backend,
        params: ScanParameters,
    ) -> Pin<
        Box<dyn Future<Output = Result<mpsc::Receiver<AdvertisementReport>, ScanError>> + Send + '_>,
    >;
}

/// Real scanner implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
        backend: Backend,
        params: ScanParameters,
    ) -> Pin<
        Box<dyn Future<Output = Result<mpsc::Receiver<AdvertisementReport>, ScanError>> + Send + '_>,
    > {
        Box::pin(async move { crate::scanner::start_scan(backend, params).await })
    }
}

/// Source of receive timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock in the local time zone, or UTC when the offset can't be determined.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

fn write_record(out: &mut dyn Write, record: &str) -> io::Result<()> {
    out.write_all(record.as_bytes())?;
    out.flush()
}

/// Run the core processing loop, writing records to `out`.
///
/// The format header (if any) is written once after the scan has started.
/// Every report is classified; matches are rendered with `clock.now()` and
/// written, everything else is dropped silently. Returns when the scanner
/// channel closes.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<(), RunError> {
    let config = options.filter_config();
    let format = options.format;

    info!("Starting BLE scanner...");
    debug!(
        "backend={} format={} min_rssi={} mask={:#X}",
        options.backend,
        format,
        config.min_rssi,
        config.mask.bits()
    );

    let mut reports = scanner
        .start_scan(options.backend, options.scan_parameters())
        .await?;
    info!("Scan started successfully");

    if let Some(header) = format.formatter().header() {
        write_record(out, header)?;
    }

    while let Some(report) = reports.recv().await {
        let Some(classification) = classify(&report, &config) else {
            trace!("No match for {} (RSSI {})", report.address, report.rssi);
            continue;
        };

        let record = render(&classification, &report, format, clock.now());
        write_record(out, &record)?;
    }

    debug!("Scanner channel closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::ServiceData;
    use crate::test_utils::{TEST_TIMESTAMP, airtag_report, base_report};

    #[derive(Debug)]
    struct FakeScanner {
        reports: Vec<AdvertisementReport>,
    }

    impl FakeScanner {
        fn new(reports: Vec<AdvertisementReport>) -> Self {
            Self { reports }
        }
    }

    impl Scanner for FakeScanner {
        fn start_scan(
            &self,
            _backend: Backend,
            _params: ScanParameters,
        ) -> Pin<
            Box<
                dyn Future<Output = Result<mpsc::Receiver<AdvertisementReport>, ScanError>>
                    + Send
                    + '_,
            >,
        > {
            let reports = self.reports.clone();
            Box::pin(async move {
                let (tx, rx) = mpsc::channel(reports.len().max(1));
                for report in reports {
                    let _ = tx.try_send(report);
                }
                // drop tx to close channel
                Ok(rx)
            })
        }
    }

    struct FailingScanner;

    impl Scanner for FailingScanner {
        fn start_scan(
            &self,
            _backend: Backend,
            _params: ScanParameters,
        ) -> Pin<
            Box<
                dyn Future<Output = Result<mpsc::Receiver<AdvertisementReport>, ScanError>>
                    + Send
                    + '_,
            >,
        > {
            Box::pin(async { Err(ScanError::Bluetooth("no adapter".to_string())) })
        }
    }

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    /// Sink that rejects every write.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn options(format: OutputFormat) -> Options {
        Options {
            format,
            min_rssi: DEFAULT_MIN_RSSI,
            manufacturer_mask: ManufacturerMask::ALL,
            backend: Backend::default(),
            passive: false,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            scan_window: DEFAULT_SCAN_WINDOW,
            adapter: 0,
            verbose: false,
        }
    }

    async fn run_to_string(options: Options, reports: Vec<AdvertisementReport>) -> String {
        let scanner = FakeScanner::new(reports);
        let mut out = Vec::<u8>::new();
        run_with_io(options, &scanner, &FixedClock(TEST_TIMESTAMP), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn run_writes_log_lines_for_matches_only() {
        let weak = {
            let mut report = airtag_report();
            report.rssi = -81;
            report
        };
        let unrelated = {
            let mut report = base_report(-40);
            report.manufacturer_data = Some(vec![0x06, 0x00, 0x01, 0x09]);
            report
        };

        let out = run_to_string(
            options(OutputFormat::Log),
            vec![weak, airtag_report(), unrelated],
        )
        .await;

        assert_eq!(
            out,
            "2025-01-15 14:03:07.250 | Apple FindMy/AirTag | AA:BB:CC:DD:EE:FF | RSSI -61 | PDU NONCONN | NONCONN | Manufacturer [4C 00 12 19 10 AA]\n"
        );
    }

    #[tokio::test]
    async fn run_writes_csv_header_once() {
        let out = run_to_string(
            options(OutputFormat::Csv),
            vec![airtag_report(), airtag_report()],
        )
        .await;

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time,manufacturer,"));
        assert_eq!(lines[1], lines[2]);
        assert_eq!(out.matches("time,manufacturer,").count(), 1);
    }

    #[tokio::test]
    async fn run_writes_header_even_without_matches() {
        let out = run_to_string(options(OutputFormat::Yaml), vec![base_report(-30)]).await;
        assert_eq!(out, "---\n");

        let out = run_to_string(options(OutputFormat::Log), vec![base_report(-30)]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn run_writes_yaml_records() {
        let out = run_to_string(options(OutputFormat::Yaml), vec![airtag_report()]).await;

        assert!(out.starts_with("---\n- time: \"2025-01-15 14:03:07.250\"\n"));
        assert!(out.contains("  manufacturer: Apple\n"));
        assert!(out.contains("  data_type: Manufacturer\n"));
    }

    #[tokio::test]
    async fn run_with_empty_mask_outputs_nothing() {
        let mut opts = options(OutputFormat::Log);
        opts.manufacturer_mask = ManufacturerMask::NONE;

        let out = run_to_string(opts, vec![airtag_report(), airtag_report()]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn run_prefers_service_data() {
        let mut report = airtag_report();
        report.service_data = vec![ServiceData::new(0xFD6F, [0u8; 6])];

        let out = run_to_string(options(OutputFormat::Log), vec![report]).await;
        assert!(out.contains("Apple FindMy/Service"));
        assert!(out.contains("| Service [00 00 00 00 00 00]"));
    }

    #[tokio::test]
    async fn run_propagates_scan_errors() {
        let mut out = Vec::<u8>::new();
        let result = run_with_io(
            options(OutputFormat::Csv),
            &FailingScanner,
            &FixedClock(TEST_TIMESTAMP),
            &mut out,
        )
        .await;

        assert!(matches!(result, Err(RunError::Scan(ScanError::Bluetooth(_)))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn run_aborts_on_write_failure() {
        let scanner = FakeScanner::new(vec![airtag_report()]);
        let result = run_with_io(
            options(OutputFormat::Log),
            &scanner,
            &FixedClock(TEST_TIMESTAMP),
            &mut BrokenPipe,
        )
        .await;

        assert!(matches!(result, Err(RunError::Io(_))));
    }

    #[test]
    fn run_blocking_with_raised_rssi_floor() {
        let mut opts = options(OutputFormat::Log);
        opts.min_rssi = -60;

        let out = tokio_test::block_on(run_to_string(opts, vec![airtag_report()]));
        assert!(out.is_empty());
    }

    #[test]
    fn options_defaults() {
        let opts = Options::try_parse_from(["findmy-scanner"]).unwrap();

        assert_eq!(opts.format, OutputFormat::Log);
        assert_eq!(opts.filter_config(), FilterConfig::default());
        assert_eq!(opts.scan_parameters(), ScanParameters::default());
        assert!(!opts.verbose);
    }

    #[test]
    fn options_parse_overrides() {
        let opts = Options::try_parse_from([
            "findmy-scanner",
            "--format",
            "csv",
            "--min-rssi",
            "-70",
            "--manufacturer-mask",
            "0x3",
            "--passive",
            "--scan-interval",
            "160",
            "--scan-window",
            "48",
            "--adapter",
            "1",
            "-v",
        ])
        .unwrap();

        assert_eq!(opts.format, OutputFormat::Csv);
        assert_eq!(
            opts.filter_config(),
            FilterConfig::new(-70, ManufacturerMask::from_bits(0x3).unwrap())
        );
        assert_eq!(
            opts.scan_parameters(),
            ScanParameters {
                active: false,
                interval: 160,
                window: 48,
                adapter: 1,
            }
        );
        assert!(opts.verbose);
    }

    #[test]
    fn options_reject_bad_values() {
        assert!(
            Options::try_parse_from(["findmy-scanner", "--manufacturer-mask", "0x10"]).is_err()
        );
        assert!(Options::try_parse_from(["findmy-scanner", "--manufacturer-mask", "F"]).is_err());
        assert!(Options::try_parse_from(["findmy-scanner", "--format", "json"]).is_err());
        assert!(Options::try_parse_from(["findmy-scanner", "--min-rssi", "loud"]).is_err());
    }
}
