//! Output formatters for classified advertisements.
//!
//! Three mutually exclusive record layouts are supported: a human-readable
//! log line, CSV and YAML. The format is chosen once at startup; formatters
//! never filter or decode, they only project a classification into text.

pub mod csv;
pub mod logline;
pub mod yaml;

use crate::advertisement::AdvertisementReport;
use crate::classifier::Classification;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

/// Pre-sized capacity of a record buffer. Every record built from a legal
/// advertisement payload fits without reallocation.
pub const RECORD_CAPACITY: usize = 512;

/// `YYYY-MM-DD HH:MM:SS.mmm`
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

/// Trait for rendering classified reports into output records.
pub trait OutputFormatter: Send + Sync {
    /// Text written once before the first record, if any.
    fn header(&self) -> Option<&'static str> {
        None
    }

    /// Format one record, including its trailing newline.
    ///
    /// # Arguments
    /// * `classification` - What the report was recognized as
    /// * `report` - The report the classification was derived from
    /// * `timestamp` - When the report was received
    fn format(
        &self,
        classification: &Classification<'_>,
        report: &AdvertisementReport,
        timestamp: OffsetDateTime,
    ) -> String;
}

/// Selectable record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pipe-separated human-readable lines
    #[default]
    Log,
    /// Comma-separated values with a header row
    Csv,
    /// A YAML document with one mapping per record
    Yaml,
}

static LOG_FORMATTER: logline::LogFormatter = logline::LogFormatter;
static CSV_FORMATTER: csv::CsvFormatter = csv::CsvFormatter;
static YAML_FORMATTER: yaml::YamlFormatter = yaml::YamlFormatter;

impl OutputFormat {
    pub fn formatter(self) -> &'static dyn OutputFormatter {
        match self {
            OutputFormat::Log => &LOG_FORMATTER,
            OutputFormat::Csv => &CSV_FORMATTER,
            OutputFormat::Yaml => &YAML_FORMATTER,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Log => write!(f, "log"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Render one record in the given format.
pub fn render(
    classification: &Classification<'_>,
    report: &AdvertisementReport,
    format: OutputFormat,
    timestamp: OffsetDateTime,
) -> String {
    format.formatter().format(classification, report, timestamp)
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS.mmm`.
pub fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Displays bytes as uppercase hex pairs separated by single spaces.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
