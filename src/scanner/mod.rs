//! BLE scanner backends.
//!
//! A backend discovers advertisements and delivers each one as an
//! [`AdvertisementReport`] over a channel. Classification happens downstream;
//! backends do no filtering of their own.

#[cfg(feature = "bluer")]
pub mod bluer;

#[cfg(feature = "hci")]
pub mod hci;

use crate::advertisement::AdvertisementReport;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel buffer size for advertisement reports.
pub const REPORT_CHANNEL_BUFFER_SIZE: usize = 256;

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Scan parameters rejected before touching the adapter
    #[error("Invalid scan parameters: {0}")]
    InvalidParameters(String),
    /// Backend not available (not compiled in)
    #[allow(dead_code)]
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(String),
}

/// Available scanner backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// BlueZ D-Bus backend (requires bluetoothd daemon)
    #[cfg(feature = "bluer")]
    Bluer,
    /// Raw HCI socket backend (direct kernel access, no daemon required)
    #[cfg(feature = "hci")]
    Hci,
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "bluer")]
        return Backend::Bluer;
        #[cfg(all(feature = "hci", not(feature = "bluer")))]
        return Backend::Hci;
        #[cfg(not(any(feature = "bluer", feature = "hci")))]
        compile_error!("At least one backend feature must be enabled");
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "bluer")]
            Backend::Bluer => write!(f, "bluer"),
            #[cfg(feature = "hci")]
            Backend::Hci => write!(f, "hci"),
            #[cfg(not(any(feature = "bluer", feature = "hci")))]
            _ => unreachable!("Backend enum has no variants when no backend features are enabled"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "bluer")]
            "bluer" | "bluez" => Ok(Backend::Bluer),
            #[cfg(feature = "hci")]
            "hci" | "raw" => Ok(Backend::Hci),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Default scan interval and window: 16 × 0.625 ms = 10 ms, the minimum
/// the controller accepts. Equal interval and window give a 100% duty cycle.
pub const DEFAULT_SCAN_INTERVAL: u16 = 0x0010;
pub const DEFAULT_SCAN_WINDOW: u16 = 0x0010;

/// Radio settings handed to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    /// Request scan responses from scannable advertisers
    pub active: bool,
    /// Scan interval in 0.625 ms units (0x0004..=0x4000)
    pub interval: u16,
    /// Scan window in 0.625 ms units, at most `interval`
    pub window: u16,
    /// HCI device index (`hci0` = 0)
    pub adapter: u16,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            active: true,
            interval: DEFAULT_SCAN_INTERVAL,
            window: DEFAULT_SCAN_WINDOW,
            adapter: 0,
        }
    }
}

impl ScanParameters {
    /// Check the interval/window against the ranges the controller accepts.
    pub fn validate(&self) -> Result<(), ScanError> {
        const RANGE: std::ops::RangeInclusive<u16> = 0x0004..=0x4000;

        if !RANGE.contains(&self.interval) {
            return Err(ScanError::InvalidParameters(format!(
                "scan interval {:#06x} outside 0x0004..=0x4000",
                self.interval
            )));
        }
        if !RANGE.contains(&self.window) {
            return Err(ScanError::InvalidParameters(format!(
                "scan window {:#06x} outside 0x0004..=0x4000",
                self.window
            )));
        }
        if self.window > self.interval {
            return Err(ScanError::InvalidParameters(format!(
                "scan window {} exceeds interval {}",
                self.window, self.interval
            )));
        }
        Ok(())
    }
}

/// Start scanning for advertisements using the specified backend.
///
/// This is the main entry point for creating a scanner. It dispatches to the
/// appropriate backend implementation based on the `backend` parameter.
///
/// # Returns
/// A receiver yielding every advertisement report the adapter sees,
/// duplicates included.
pub async fn start_scan(
    backend: Backend,
    params: ScanParameters,
) -> Result<mpsc::Receiver<AdvertisementReport>, ScanError> {
    params.validate()?;

    match backend {
        #[cfg(feature = "bluer")]
        Backend::Bluer => bluer::start_scan(params).await,
        #[cfg(feature = "hci")]
        Backend::Hci => hci::start_scan(params).await,
    }
}
