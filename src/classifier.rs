//! Advertisement classification.
//!
//! Detection order per report:
//! 1. RSSI floor.
//! 2. Service-data entries, in received order. The first entry that decodes
//!    and whose manufacturer is enabled wins. Entries that decode but are
//!    disabled are skipped.
//! 3. Manufacturer data, only when no service-data entry decoded at all.
//!
//! Unclassifiable reports are expected traffic and simply yield `None`.

use crate::advertisement::AdvertisementReport;
use crate::decoder::{DeviceMatch, manufacturer_data, service_data};
use crate::filter::FilterConfig;
use crate::registry::Manufacturer;
use std::fmt;

/// Which decoder produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Service,
    Manufacturer,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Service => "Service",
            DetectionSource::Manufacturer => "Manufacturer",
        }
    }
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report recognized as an item finder.
///
/// Borrows the matched bytes from the report it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    /// Never [`Manufacturer::Other`]
    pub manufacturer: Manufacturer,
    pub device_type: &'static str,
    pub source: DetectionSource,
    /// Service-data payload or full manufacturer data, whichever matched
    pub data: &'a [u8],
}

impl<'a> Classification<'a> {
    fn new(found: DeviceMatch, source: DetectionSource, data: &'a [u8]) -> Self {
        Self {
            manufacturer: found.manufacturer,
            device_type: found.device_type,
            source,
            data,
        }
    }
}

/// Classify a single advertisement report.
pub fn classify<'a>(
    report: &'a AdvertisementReport,
    config: &FilterConfig,
) -> Option<Classification<'a>> {
    if !config.admit(report.rssi) {
        return None;
    }

    let mut service_matched = false;
    for entry in &report.service_data {
        let Some(found) = service_data::try_decode(entry.uuid, &entry.data) else {
            continue;
        };
        if config.is_enabled(found.manufacturer) {
            return Some(Classification::new(
                found,
                DetectionSource::Service,
                &entry.data,
            ));
        }
        service_matched = true;
    }

    if service_matched {
        return None;
    }

    let data = report.manufacturer_data.as_deref()?;
    manufacturer_data::try_decode(data)
        .filter(|found| config.is_enabled(found.manufacturer))
        .map(|found| Classification::new(found, DetectionSource::Manufacturer, data))
}
