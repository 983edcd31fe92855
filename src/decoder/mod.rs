//! Decoders for the two advertisement encodings item finders use.
//!
//! Both decoders are purely structural: they say which manufacturer a payload
//! belongs to and what kind of device it announces. Whether that manufacturer
//! is enabled is decided by the classifier.

pub mod manufacturer_data;
pub mod service_data;

use crate::registry::Manufacturer;

/// A structurally recognized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMatch {
    pub manufacturer: Manufacturer,
    /// Short label from the manufacturer's fixed vocabulary, e.g. `FindMy/AirTag`
    pub device_type: &'static str,
}

impl DeviceMatch {
    pub const fn new(manufacturer: Manufacturer, device_type: &'static str) -> Self {
        Self {
            manufacturer,
            device_type,
        }
    }
}
