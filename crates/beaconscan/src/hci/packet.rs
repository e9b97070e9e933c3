//! HCI packet structures and parsing
//!
//! This module contains the event frame parser and the command encoder used
//! to toggle LE scanning.

use crate::error::DecodeError;
use crate::hci::constants::*;
use byteorder::{ByteOrder, LittleEndian};

/// HCI Commands issued by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HciCommand {
    // LE Commands (OGF: 0x08)
    LeSetScanEnable { enable: bool, filter_duplicates: bool },
}

impl HciCommand {
    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::LeSetScanEnable { .. } => (OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE),
        }
    }

    /// Get the packed 16-bit opcode
    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        ((ogf as u16) << 10) | (ocf & 0x3ff)
    }

    /// Convert the command to its raw parameter bytes
    pub fn parameters(&self) -> Vec<u8> {
        match *self {
            Self::LeSetScanEnable {
                enable,
                filter_duplicates,
            } => vec![enable as u8, filter_duplicates as u8],
        }
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut opcode = [0u8; 2];
        LittleEndian::write_u16(&mut opcode, self.opcode());

        let mut packet = Vec::with_capacity(4 + params.len());
        packet.push(HCI_COMMAND_PKT);
        packet.extend_from_slice(&opcode);
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }
}

/// The three leading bytes of every packet read from the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HciEventHeader {
    pub packet_type: u8,
    pub event_code: u8,
    /// Declared parameter length. Not checked against the bytes that follow.
    pub param_len: u8,
}

impl HciEventHeader {
    /// Parse the header from the start of a raw packet
    pub fn parse(packet: &[u8]) -> Result<Self, DecodeError> {
        match packet {
            [packet_type, event_code, param_len, ..] => Ok(Self {
                packet_type: *packet_type,
                event_code: *event_code,
                param_len: *param_len,
            }),
            _ => Err(DecodeError::truncated(
                "HCI event header",
                HCI_EVENT_HEADER_SIZE,
                packet.len(),
            )),
        }
    }

    /// Split a raw packet into its header and the bytes after it
    pub fn split(packet: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let header = Self::parse(packet)?;
        Ok((header, &packet[HCI_EVENT_HEADER_SIZE..]))
    }

    pub fn is_le_meta_event(&self) -> bool {
        self.event_code == EVT_LE_META_EVENT
    }
}

/// LE Meta Event envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeMetaEvent<'a> {
    pub subevent_code: u8,
    /// Everything after the sub-event code
    pub payload: &'a [u8],
}

impl<'a> LeMetaEvent<'a> {
    /// Parse the LE Meta Event carried after `header`
    ///
    /// Returns `Ok(None)` for any other event code.
    pub fn try_parse(
        header: &HciEventHeader,
        remainder: &'a [u8],
    ) -> Result<Option<Self>, DecodeError> {
        if !header.is_le_meta_event() {
            return Ok(None);
        }

        match remainder.split_first() {
            Some((&subevent_code, payload)) => Ok(Some(Self {
                subevent_code,
                payload,
            })),
            None => Err(DecodeError::truncated("LE meta sub-event code", 1, 0)),
        }
    }

    pub fn is_advertising_report(&self) -> bool {
        self.subevent_code == EVT_LE_ADVERTISING_REPORT
    }
}
