//! HCI protocol constants
//!
//! This module contains the constants of the Bluetooth HCI protocol used by
//! the LE scanner.

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;

// Largest event packet a single socket read delivers
pub const HCI_MAX_EVENT_SIZE: usize = 255;

// packet type + event code + parameter length
pub const HCI_EVENT_HEADER_SIZE: usize = 3;

// LE Controller Commands (OGF: 0x08)
pub const OGF_LE_CTL: u8 = 0x08;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// HCI Events
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_CONN_COMPLETE: u8 = 0x01;
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// LE address type
pub const LE_PUBLIC_ADDRESS: u8 = 0x00;

// Advertising event types
pub const ADV_IND: u8 = 0x00;
pub const ADV_DIRECT_IND: u8 = 0x01;
pub const ADV_SCAN_IND: u8 = 0x02;
pub const ADV_NONCONN_IND: u8 = 0x03;
pub const ADV_SCAN_RSP: u8 = 0x04;

// Socket options
pub const SOL_HCI: i32 = 0;
pub const HCI_FILTER: i32 = 2;
