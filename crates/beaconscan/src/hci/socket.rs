//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! used as the packet source and scan-mode switch of a discovery session.

use crate::error::HciError;
use crate::hci::constants::*;
use crate::hci::packet::HciCommand;
use crate::scan::HciTransport;
use bitflags::bitflags;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_RAW: i32 = 0;

bitflags! {
    /// Packet types passed by an HCI socket filter
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PacketTypeMask: u32 {
        const COMMAND = 1 << 0x01;
        const ACL = 1 << 0x02;
        const SCO = 1 << 0x03;
        const EVENT = 1 << 0x04;
    }
}

/// Socket level filter selecting which packets a raw HCI socket receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HciFilter {
    pub packet_types: PacketTypeMask,
    pub event_mask: [u32; 2],
    pub opcode: u16,
}

impl HciFilter {
    /// Filter passing every HCI event and nothing else
    pub fn all_events() -> Self {
        Self {
            packet_types: PacketTypeMask::EVENT,
            event_mask: [u32::MAX; 2],
            opcode: 0,
        }
    }

    /// Whether `event_code` passes the event mask
    pub fn passes_event(&self, event_code: u8) -> bool {
        let word = ((event_code as usize) >> 5) & 1;
        self.event_mask[word] & (1 << (event_code & 31)) != 0
    }
}

// Layout of struct hci_filter as seen by getsockopt/setsockopt
#[repr(C)]
#[derive(Default)]
struct RawHciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl From<&HciFilter> for RawHciFilter {
    fn from(filter: &HciFilter) -> Self {
        Self {
            type_mask: filter.packet_types.bits(),
            event_mask: filter.event_mask,
            opcode: filter.opcode.to_le(),
        }
    }
}

impl From<RawHciFilter> for HciFilter {
    fn from(raw: RawHciFilter) -> Self {
        Self {
            packet_types: PacketTypeMask::from_bits_retain(raw.type_mask),
            event_mask: raw.event_mask,
            opcode: u16::from_le(raw.opcode),
        }
    }
}

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
    read_timeout: Option<Duration>,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

impl HciSocket {
    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    ///
    /// # Returns
    ///
    /// A new `HciSocket` instance or an error if the socket could not be opened
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        // Open a raw HCI socket
        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_RAW, BTPROTO_HCI) };

        if fd < 0 {
            return Err(HciError::SocketError(std::io::Error::last_os_error()));
        }

        // Bind to the specified device
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW as u16,
        };

        let result = unsafe {
            libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(HciError::BindError(err));
        }

        log::debug!("Opened HCI socket for hci{}", dev_id);
        Ok(HciSocket {
            fd,
            read_timeout: None,
        })
    }

    /// Bound every packet read by `timeout`; `None` blocks indefinitely
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Read the filter currently installed on the socket
    pub fn filter(&self) -> Result<HciFilter, HciError> {
        let mut raw = RawHciFilter::default();
        let mut len = std::mem::size_of::<RawHciFilter>() as libc::socklen_t;

        let result = unsafe {
            libc::getsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &mut raw as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };

        if result < 0 {
            return Err(HciError::GetFilterError(std::io::Error::last_os_error()));
        }

        Ok(raw.into())
    }

    /// Install a socket filter
    pub fn set_filter(&self, filter: &HciFilter) -> Result<(), HciError> {
        let raw = RawHciFilter::from(filter);

        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &raw as *const _ as *const libc::c_void,
                std::mem::size_of::<RawHciFilter>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(HciError::SetFilterError(std::io::Error::last_os_error()));
        }

        Ok(())
    }

    /// Read one raw packet, including its packet type byte
    ///
    /// Returns `Ok(None)` once the socket reports end of stream.
    pub fn recv_packet(&self) -> Result<Option<Vec<u8>>, HciError> {
        let mut buffer = [0u8; HCI_MAX_EVENT_SIZE];

        let bytes_read = unsafe {
            libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            )
        };

        if bytes_read < 0 {
            return Err(HciError::ReceiveError(std::io::Error::last_os_error()));
        }

        if bytes_read == 0 {
            return Ok(None);
        }

        Ok(Some(buffer[..bytes_read as usize].to_vec()))
    }

    /// Read one raw packet, waiting at most `timeout` for it to arrive
    pub fn recv_packet_timeout(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<Vec<u8>>, HciError> {
        if let Some(timeout) = timeout {
            // Set up the fd_set for select()
            let mut read_fds: libc::fd_set = unsafe { std::mem::zeroed() };
            unsafe {
                libc::FD_ZERO(&mut read_fds);
                libc::FD_SET(self.fd, &mut read_fds);
            }

            let mut timeout_val = libc::timeval {
                tv_sec: timeout.as_secs() as libc::time_t,
                tv_usec: timeout.subsec_micros() as libc::suseconds_t,
            };

            let result = unsafe {
                libc::select(
                    self.fd + 1,
                    &mut read_fds,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    &mut timeout_val,
                )
            };

            if result < 0 {
                return Err(HciError::ReceiveError(std::io::Error::last_os_error()));
            }

            if result == 0 {
                return Err(HciError::ReceiveError(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "Timed out waiting for HCI event",
                )));
            }
        }

        self.recv_packet()
    }

    /// Sends an HCI command to the controller
    pub fn send_command(&self, command: &HciCommand) -> Result<(), HciError> {
        let packet = command.to_packet();
        match unsafe {
            libc::write(
                self.fd,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        } {
            -1 => Err(HciError::SendError(std::io::Error::last_os_error())),
            _ => Ok(()),
        }
    }

    fn toggle_le_scan(&self, enable: bool) -> Result<(), HciError> {
        self.send_command(&HciCommand::LeSetScanEnable {
            enable,
            filter_duplicates: false,
        })
    }
}

impl HciTransport for HciSocket {
    fn read_packet(&mut self) -> Result<Option<Vec<u8>>, HciError> {
        self.recv_packet_timeout(self.read_timeout)
    }

    fn enable_scan(&mut self) -> Result<(), HciError> {
        self.toggle_le_scan(true)
    }

    fn disable_scan(&mut self) -> Result<(), HciError> {
        self.toggle_le_scan(false)
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
