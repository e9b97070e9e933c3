//! iBeacon recognition
//!
//! A report window is recognized as an iBeacon when the nine bytes at
//! [`ADVERTISING_FLAGS`] match [`IBEACON_PREFIX`]: a flags AD structure
//! followed by Apple manufacturer data of the iBeacon type and length. All
//! fields are then read at fixed offsets from the start of the window.

use crate::error::DecodeError;
use crate::hex::{to_hex_colon, to_hex_plain};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Offset of the advertising flags, where the signature check starts
pub const ADVERTISING_FLAGS: usize = 10;

/// Flags (LE General Discoverable, BR/EDR not supported), manufacturer data
/// of length 26 from company 0x004C, iBeacon type 0x02 and length 0x15
pub const IBEACON_PREFIX: [u8; 9] = [0x02, 0x01, 0x06, 0x1a, 0xff, 0x4c, 0x00, 0x02, 0x15];

const MAC_START: usize = 3;
const UUID_START: usize = 19;
const MAJOR_START: usize = 35;
const MINOR_START: usize = 37;
const TX_POWER: usize = 39;

/// Shortest report window holding every iBeacon field
pub const IBEACON_MIN_REPORT_LEN: usize = TX_POWER + 1;

/// Kind of beacon a report decoded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeaconType {
    Unknown,
    IBeacon,
}

impl fmt::Display for BeaconType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeaconType::Unknown => write!(f, "Unknown"),
            BeaconType::IBeacon => write!(f, "iBeacon"),
        }
    }
}

/// The fields of an iBeacon advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IBeacon {
    pub mac: [u8; 6],
    pub uuid: [u8; 16],
    pub major: [u8; 2],
    pub minor: [u8; 2],
    /// Raw transmit power byte, read unsigned
    pub tx_power: u8,
}

impl IBeacon {
    /// Identity key: hex of uuid, major and minor without separators
    pub fn unique_id(&self) -> String {
        let mut id = to_hex_plain(&self.uuid);
        id.push_str(&to_hex_plain(&self.major));
        id.push_str(&to_hex_plain(&self.minor));
        id
    }

    pub fn mac_string(&self) -> String {
        to_hex_colon(&self.mac)
    }

    pub fn printable_uuid(&self) -> String {
        to_hex_colon(&self.uuid)
    }

    pub fn printable_major(&self) -> String {
        to_hex_colon(&self.major)
    }

    pub fn printable_minor(&self) -> String {
        to_hex_colon(&self.minor)
    }

    pub fn major_value(&self) -> u16 {
        BigEndian::read_u16(&self.major)
    }

    pub fn minor_value(&self) -> u16 {
        BigEndian::read_u16(&self.minor)
    }

    /// Transmit power as an unsigned integer (0xC5 reads as 197)
    pub fn tx_power(&self) -> u8 {
        self.tx_power
    }

    /// Transmit power read as a two's-complement dBm value (0xC5 reads as -59)
    pub fn tx_power_signed(&self) -> i8 {
        self.tx_power as i8
    }
}

impl fmt::Display for IBeacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type: {} Mac: {} UDID: {} Major: {} Minor: {} TxPower: {}",
            BeaconType::IBeacon,
            self.mac_string(),
            self.printable_uuid(),
            self.printable_major(),
            self.printable_minor(),
            self.tx_power
        )
    }
}

/// Result of recognizing a single advertising report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Beacon {
    /// Advertising data in any layout other than iBeacon
    Unknown,
    IBeacon(IBeacon),
}

impl Beacon {
    pub fn kind(&self) -> BeaconType {
        match self {
            Beacon::Unknown => BeaconType::Unknown,
            Beacon::IBeacon(_) => BeaconType::IBeacon,
        }
    }

    /// Identity key, `None` for unknown beacons
    pub fn unique_id(&self) -> Option<String> {
        match self {
            Beacon::Unknown => None,
            Beacon::IBeacon(beacon) => Some(beacon.unique_id()),
        }
    }

    pub fn as_ibeacon(&self) -> Option<&IBeacon> {
        match self {
            Beacon::Unknown => None,
            Beacon::IBeacon(beacon) => Some(beacon),
        }
    }
}

/// Decode the beacon carried by a report window
///
/// Windows shorter than [`IBEACON_MIN_REPORT_LEN`] are rejected before any
/// byte is compared, whatever their content.
pub fn recognize(report: &[u8]) -> Result<Beacon, DecodeError> {
    if report.len() < IBEACON_MIN_REPORT_LEN {
        return Err(DecodeError::truncated(
            "iBeacon report",
            IBEACON_MIN_REPORT_LEN,
            report.len(),
        ));
    }

    let is_ibeacon = IBEACON_PREFIX
        .iter()
        .zip(&report[ADVERTISING_FLAGS..])
        .all(|(expected, actual)| expected == actual);

    if !is_ibeacon {
        return Ok(Beacon::Unknown);
    }

    Ok(Beacon::IBeacon(IBeacon {
        mac: field(report, MAC_START)?,
        uuid: field(report, UUID_START)?,
        major: field(report, MAJOR_START)?,
        minor: field(report, MINOR_START)?,
        tx_power: field::<1>(report, TX_POWER)?[0],
    }))
}

fn field<const N: usize>(report: &[u8], start: usize) -> Result<[u8; N], DecodeError> {
    report
        .get(start..start + N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| DecodeError::truncated("iBeacon field", start + N, report.len()))
}
