//! Raw HCI socket backend.
//!
//! This backend uses raw Linux HCI sockets to receive LE Advertising Report
//! events without requiring the BlueZ daemon. It requires CAP_NET_RAW and
//! CAP_NET_ADMIN capabilities or root privileges. Because it sees the raw
//! event, it is the only backend that reports the PDU kind.

use super::{REPORT_CHANNEL_BUFFER_SIZE, ScanError, ScanParameters};
use crate::advertisement::{AdvType, AdvertisementReport};
use crate::mac_address::MacAddress;
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use log::{debug, info, trace};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

// HCI protocol constants
const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

// HCI packet types
const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;

// HCI events
const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta event sub-events
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// HCI commands
const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Scan types
const LE_SCAN_PASSIVE: u8 = 0x00;
const LE_SCAN_ACTIVE: u8 = 0x01;

// Own address type
const LE_PUBLIC_ADDRESS: u8 = 0x00;

// Filter policy
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

/// Largest HCI event: 3 header bytes + 255 parameter bytes.
const HCI_MAX_EVENT_SIZE: usize = 258;

/// Fixed part of one advertising report: event type, address type,
/// address, data length. Followed by the data and one RSSI byte.
const REPORT_HEADER_LEN: usize = 9;

/// HCI socket address structure
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// HCI filter structure for raw sockets
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn new() -> Self {
        Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        }
    }

    fn set_ptype(&mut self, ptype: u8) {
        self.type_mask |= 1 << (ptype as u32);
    }

    fn set_event(&mut self, event: u8) {
        let bit = event as usize;
        self.event_mask[bit / 32] |= 1 << (bit % 32);
    }
}

/// Create an HCI command packet
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// Parameters of LE Set Scan Parameters, little-endian on the wire.
fn scan_parameters_payload(params: &ScanParameters) -> [u8; 7] {
    let interval = params.interval.to_le_bytes();
    let window = params.window.to_le_bytes();
    [
        if params.active {
            LE_SCAN_ACTIVE
        } else {
            LE_SCAN_PASSIVE
        },
        interval[0],
        interval[1],
        window[0],
        window[1],
        LE_PUBLIC_ADDRESS,
        FILTER_POLICY_ACCEPT_ALL,
    ]
}

/// Open a raw HCI socket
fn open_hci_socket() -> Result<OwnedFd, ScanError> {
    // libc directly since nix doesn't support BTPROTO_HCI.
    // SOCK_NONBLOCK is required for AsyncFd to work properly
    let fd = unsafe {
        libc::socket(
            AF_BLUETOOTH,
            SOCK_RAW | SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
            BTPROTO_HCI,
        )
    };

    if fd < 0 {
        return Err(ScanError::Bluetooth(format!(
            "Failed to create HCI socket: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Bind HCI socket to a device
fn bind_hci_socket(fd: &OwnedFd, dev_id: u16) -> Result<(), ScanError> {
    let addr = SockaddrHci {
        hci_family: AF_BLUETOOTH as u16,
        hci_dev: dev_id,
        hci_channel: HCI_CHANNEL_RAW,
    };

    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const SockaddrHci as *const sockaddr,
            mem::size_of::<SockaddrHci>() as socklen_t,
        )
    };

    if ret < 0 {
        return Err(ScanError::Bluetooth(format!(
            "Failed to bind HCI socket to hci{dev_id}: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

/// Only let LE meta events through to the socket
fn set_hci_filter(fd: &OwnedFd) -> Result<(), ScanError> {
    let mut filter = HciFilter::new();
    filter.set_ptype(HCI_EVENT_PKT);
    filter.set_event(EVT_LE_META_EVENT);

    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            SOL_HCI,
            HCI_FILTER,
            &filter as *const HciFilter as *const c_void,
            mem::size_of::<HciFilter>() as socklen_t,
        )
    };

    if ret < 0 {
        return Err(ScanError::Bluetooth(format!(
            "Failed to set HCI filter: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

/// Send an HCI command
fn send_hci_command(fd: &OwnedFd, packet: &[u8]) -> Result<(), ScanError> {
    let ret = unsafe {
        libc::write(
            fd.as_raw_fd(),
            packet.as_ptr() as *const c_void,
            packet.len(),
        )
    };

    if ret < 0 {
        return Err(ScanError::Bluetooth(format!(
            "Failed to send HCI command: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

/// Configure and enable LE scanning with duplicate filtering off.
fn configure_le_scan(fd: &OwnedFd, params: &ScanParameters) -> Result<(), ScanError> {
    let packet = hci_command_packet(
        OGF_LE_CTL,
        OCF_LE_SET_SCAN_PARAMETERS,
        &scan_parameters_payload(params),
    );
    send_hci_command(fd, &packet)?;

    // enable = 1, filter_duplicates = 0
    let packet = hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[0x01, 0x00]);
    send_hci_command(fd, &packet)?;

    Ok(())
}

/// Parse an LE Advertising Report event into reports.
///
/// `event` is the full packet as read from the socket, starting with the
/// HCI packet type byte. Reports are laid out back to back; parsing stops at
/// the first one that does not fit in the event.
fn parse_advertising_event(event: &[u8]) -> Vec<AdvertisementReport> {
    let mut reports = Vec::new();

    // packet type, event code, parameter length, subevent, number of reports
    if event.len() < 5
        || event[0] != HCI_EVENT_PKT
        || event[1] != EVT_LE_META_EVENT
        || event[3] != EVT_LE_ADVERTISING_REPORT
    {
        return reports;
    }

    let num_reports = event[4] as usize;
    let mut rest = &event[5..];

    for _ in 0..num_reports {
        if rest.len() < REPORT_HEADER_LEN {
            trace!("Truncated advertising report header");
            break;
        }

        let adv_type = AdvType::from_hci_event_type(rest[0]);
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&rest[2..8]);
        let data_len = rest[8] as usize;

        // data followed by one RSSI byte
        if rest.len() < REPORT_HEADER_LEN + data_len + 1 {
            trace!("Truncated advertising report data");
            break;
        }

        let ad_data = &rest[REPORT_HEADER_LEN..REPORT_HEADER_LEN + data_len];
        let rssi = rest[REPORT_HEADER_LEN + data_len] as i8;

        reports.push(AdvertisementReport::from_ad_structures(
            MacAddress::from_le_bytes(addr),
            i16::from(rssi),
            adv_type,
            ad_data,
        ));

        rest = &rest[REPORT_HEADER_LEN + data_len + 1..];
    }

    reports
}

/// Start scanning using raw HCI sockets.
///
/// Opens a raw HCI socket, configures LE scanning, and forwards every
/// advertising report through the returned channel. Runs indefinitely until
/// interrupted or the receiver is dropped.
///
/// # Requirements
/// - CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges
/// - An available HCI device (`params.adapter`, typically hci0)
pub async fn start_scan(
    params: ScanParameters,
) -> Result<mpsc::Receiver<AdvertisementReport>, ScanError> {
    // Socket for receiving events
    let fd = open_hci_socket()?;
    bind_hci_socket(&fd, params.adapter)?;
    set_hci_filter(&fd)?;

    // Separate socket for sending commands
    let cmd_fd = open_hci_socket()?;
    bind_hci_socket(&cmd_fd, params.adapter)?;
    configure_le_scan(&cmd_fd, &params)?;
    info!(
        "LE scan enabled on hci{} ({}, interval {}, window {})",
        params.adapter,
        if params.active { "active" } else { "passive" },
        params.interval,
        params.window
    );

    let (tx, rx) = mpsc::channel(REPORT_CHANNEL_BUFFER_SIZE);

    let async_fd = AsyncFd::new(fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {}", e)))?;

    tokio::spawn(async move {
        let _cmd_fd = cmd_fd; // Keep command socket alive
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        loop {
            let mut guard = match async_fd.readable().await {
                Ok(guard) => guard,
                Err(e) => {
                    debug!("HCI socket closed: {e}");
                    break;
                }
            };

            // Drain all available packets before waiting again
            loop {
                let n = match guard.try_io(|inner| {
                    let ret = unsafe {
                        libc::read(
                            inner.as_raw_fd(),
                            buf.as_mut_ptr() as *mut c_void,
                            buf.len(),
                        )
                    };
                    if ret < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(ret as usize)
                    }
                }) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) => break,  // EOF or empty read
                    Ok(Err(_)) => break, // Read error
                    Err(_) => break,     // WouldBlock - no more data
                };

                for report in parse_advertising_event(&buf[..n]) {
                    if tx.send(report).await.is_err() {
                        debug!("Report receiver dropped, stopping HCI scan");
                        return;
                    }
                }
            }
        }
    });

    Ok(rx)
}
