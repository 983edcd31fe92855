//! BLE advertisement report as delivered by a scanner backend.
//!
//! A report is read-only input to the classifier. Backends either fill it in
//! directly (BlueZ hands out already-parsed properties) or build it from raw
//! advertising data with [`AdvertisementReport::from_ad_structures`].

use crate::mac_address::MacAddress;
use std::fmt;

/// AD type: Service Data with a 16-bit UUID.
pub const AD_TYPE_SERVICE_DATA_16: u8 = 0x16;

/// AD type: Manufacturer Specific Data.
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Advertising PDU kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvType {
    /// Connectable and scannable undirected (ADV_IND)
    Ind,
    /// Connectable directed (ADV_DIRECT_IND)
    DirectInd,
    /// Scannable undirected (ADV_SCAN_IND)
    ScanInd,
    /// Non-connectable undirected (ADV_NONCONN_IND)
    NonConnInd,
    /// Scan response (SCAN_RSP)
    ScanRsp,
    Unknown,
}

impl AdvType {
    /// Map the event type byte of an HCI LE Advertising Report.
    pub fn from_hci_event_type(event_type: u8) -> Self {
        match event_type {
            0x00 => AdvType::Ind,
            0x01 => AdvType::DirectInd,
            0x02 => AdvType::ScanInd,
            0x03 => AdvType::NonConnInd,
            0x04 => AdvType::ScanRsp,
            _ => AdvType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdvType::Ind => "ADV_IND",
            AdvType::DirectInd => "DIR_IND",
            AdvType::ScanInd => "SCAN_IND",
            AdvType::NonConnInd => "NONCONN",
            AdvType::ScanRsp => "SCAN_RSP",
            AdvType::Unknown => "UNKNOWN",
        }
    }

    pub fn is_connectable(&self) -> bool {
        matches!(self, AdvType::Ind | AdvType::DirectInd)
    }

    pub fn is_scannable(&self) -> bool {
        matches!(self, AdvType::Ind | AdvType::ScanInd)
    }
}

impl fmt::Display for AdvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One service-data AD structure keyed by a 16-bit service UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceData {
    pub uuid: u16,
    pub data: Vec<u8>,
}

impl ServiceData {
    pub fn new(uuid: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid,
            data: data.into(),
        }
    }
}

/// A single received advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementReport {
    /// Advertiser address
    pub address: MacAddress,
    /// Received signal strength in dBm
    pub rssi: i16,
    /// PDU kind
    pub adv_type: AdvType,
    pub connectable: bool,
    pub scannable: bool,
    /// Service-data entries in the order they were received
    pub service_data: Vec<ServiceData>,
    /// Manufacturer data including the little-endian company id prefix
    pub manufacturer_data: Option<Vec<u8>>,
}

impl AdvertisementReport {
    /// Create a report without any data blocks. Connectable and scannable
    /// flags are derived from the PDU kind.
    pub fn new(address: MacAddress, rssi: i16, adv_type: AdvType) -> Self {
        Self {
            address,
            rssi,
            adv_type,
            connectable: adv_type.is_connectable(),
            scannable: adv_type.is_scannable(),
            service_data: Vec::new(),
            manufacturer_data: None,
        }
    }

    /// Build a report from raw advertising data.
    ///
    /// AD structure format: `[length] [type] [payload...]`, where `length`
    /// covers the type byte and the payload. Parsing stops at a zero length
    /// or at a structure that runs past the end of `ad_data`; anything
    /// collected before that point is kept.
    pub fn from_ad_structures(
        address: MacAddress,
        rssi: i16,
        adv_type: AdvType,
        ad_data: &[u8],
    ) -> Self {
        let mut report = Self::new(address, rssi, adv_type);

        let mut offset = 0;
        while offset < ad_data.len() {
            let len = ad_data[offset] as usize;
            if len == 0 || offset + 1 + len > ad_data.len() {
                break;
            }

            let ad_type = ad_data[offset + 1];
            let payload = &ad_data[offset + 2..offset + 1 + len];

            match ad_type {
                AD_TYPE_SERVICE_DATA_16 if payload.len() >= 2 => {
                    let uuid = u16::from_le_bytes([payload[0], payload[1]]);
                    report.service_data.push(ServiceData::new(uuid, &payload[2..]));
                }
                AD_TYPE_MANUFACTURER_DATA if report.manufacturer_data.is_none() => {
                    report.manufacturer_data = Some(payload.to_vec());
                }
                _ => {}
            }

            offset += 1 + len;
        }

        report
    }
}
