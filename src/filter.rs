//! Admission filter applied before any decoding.
//!
//! Built once from the command line and read-only afterwards.

use crate::registry::{Manufacturer, ManufacturerMask};

/// Default minimum RSSI in dBm.
pub const DEFAULT_MIN_RSSI: i16 = -80;

/// Process-wide filter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Inclusive RSSI floor (dBm). Weaker reports are dropped.
    pub min_rssi: i16,
    /// Which manufacturers may produce a classification
    pub mask: ManufacturerMask,
}

impl FilterConfig {
    pub const fn new(min_rssi: i16, mask: ManufacturerMask) -> Self {
        Self { min_rssi, mask }
    }

    /// `true` iff `rssi >= min_rssi`.
    pub fn admit(&self, rssi: i16) -> bool {
        rssi >= self.min_rssi
    }

    pub fn is_enabled(&self, manufacturer: Manufacturer) -> bool {
        self.mask.is_enabled(manufacturer)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RSSI, ManufacturerMask::ALL)
    }
}
