//! BlueZ D-Bus backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.
//!
//! BlueZ hands out parsed device properties rather than raw PDUs, so reports
//! from this backend carry [`AdvType::Unknown`] and no connectable/scannable
//! flags, and service-data entries are ordered by UUID.

use super::{REPORT_CHANNEL_BUFFER_SIZE, ScanError, ScanParameters};
use crate::advertisement::{AdvType, AdvertisementReport, ServiceData};
use crate::mac_address::MacAddress;
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session, Uuid};
use futures::StreamExt;
use log::{debug, info, trace};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Bluetooth Base UUID with the 32-bit short id zeroed.
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Short 16-bit form of a Bluetooth SIG UUID, if it has one.
fn uuid16(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    if value & ((1u128 << 96) - 1) != BLUETOOTH_BASE_UUID {
        return None;
    }
    u16::try_from(value >> 96).ok()
}

/// Start scanning using the BlueZ D-Bus backend.
///
/// Starts LE discovery with duplicate data enabled so every advertisement
/// updates the device properties, and forwards a report for each update.
/// Runs indefinitely until interrupted or the receiver is dropped.
pub async fn start_scan(
    params: ScanParameters,
) -> Result<mpsc::Receiver<AdvertisementReport>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    if !params.active {
        debug!("BlueZ always scans actively; ignoring passive request");
    }

    adapter
        .set_discovery_filter(DiscoveryFilter {
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        })
        .await?;

    let mut events = adapter.discover_devices_with_changes().await?;
    info!("BlueZ discovery started on {}", adapter.name());

    let (tx, rx) = mpsc::channel(REPORT_CHANNEL_BUFFER_SIZE);

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        let _session = session;

        while let Some(event) = events.next().await {
            let AdapterEvent::DeviceAdded(address) = event else {
                continue;
            };

            match read_report(&adapter, address).await {
                Ok(Some(report)) => {
                    if tx.send(report).await.is_err() {
                        debug!("Report receiver dropped, stopping BlueZ discovery");
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => trace!("Skipping {address}: {e}"),
            }
        }
    });

    Ok(rx)
}

/// Read the current advertisement properties of a device.
///
/// Returns `None` when BlueZ has no RSSI for it, which means the properties
/// are cached from an earlier discovery rather than freshly received.
async fn read_report(
    adapter: &Adapter,
    address: Address,
) -> Result<Option<AdvertisementReport>, ScanError> {
    let device = adapter.device(address)?;

    let Some(rssi) = device.rssi().await? else {
        return Ok(None);
    };

    let service_data = device.service_data().await?.unwrap_or_default();
    let manufacturer_data = device.manufacturer_data().await?.unwrap_or_default();

    Ok(Some(build_report(
        address.into(),
        rssi,
        service_data,
        manufacturer_data,
    )))
}

/// Assemble a report from BlueZ property maps.
///
/// BlueZ strips the company id from manufacturer data; it is put back in
/// front, little-endian, so the bytes match what was on the air.
fn build_report(
    address: MacAddress,
    rssi: i16,
    service_data: HashMap<Uuid, Vec<u8>>,
    manufacturer_data: HashMap<u16, Vec<u8>>,
) -> AdvertisementReport {
    let mut report = AdvertisementReport::new(address, rssi, AdvType::Unknown);

    report.service_data = service_data
        .into_iter()
        .filter_map(|(uuid, data)| uuid16(&uuid).map(|uuid| ServiceData::new(uuid, data)))
        .collect();
    report.service_data.sort_by_key(|entry| entry.uuid);

    report.manufacturer_data = manufacturer_data
        .into_iter()
        .min_by_key(|(company_id, _)| *company_id)
        .map(|(company_id, data)| {
            let mut bytes = Vec::with_capacity(2 + data.len());
            bytes.extend_from_slice(&company_id.to_le_bytes());
            bytes.extend_from_slice(&data);
            bytes
        });

    report
}
