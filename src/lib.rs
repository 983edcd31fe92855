//! `findmy-scanner` library.
//!
//! Classifies BLE advertisements from item-finder ecosystems (Apple Find My,
//! Google Fast Pair, Samsung SmartTag, Xiaomi) and renders them as records.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process exit codes.
//! The classifier and formatters are pure functions; [`crate::app`] wires them to an
//! injected scanner, clock and output stream so the whole loop can be tested
//! without Bluetooth hardware.

pub mod advertisement;
pub mod app;
pub mod classifier;
pub mod decoder;
pub mod filter;
pub mod mac_address;
pub mod output;
pub mod registry;
pub mod scanner;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{AdvType, AdvertisementReport, ServiceData};
pub use classifier::{Classification, DetectionSource, classify};
pub use filter::FilterConfig;
pub use mac_address::MacAddress;
pub use output::{OutputFormat, OutputFormatter, render};
pub use registry::{Manufacturer, ManufacturerMask, company_name, service_uuid_to_company};
pub use scanner::{Backend, ScanError, ScanParameters};
