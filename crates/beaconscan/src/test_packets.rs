//! Packet builders shared by the unit tests

use crate::beacon::IBEACON_PREFIX;
use crate::hci::constants::*;

pub const SAMPLE_MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
pub const SAMPLE_UUID: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
];
pub const SAMPLE_MAJOR: [u8; 2] = [0x00, 0x01];
pub const SAMPLE_MINOR: [u8; 2] = [0x00, 0x02];
pub const SAMPLE_TX_POWER: u8 = 0xC0;

pub const SAMPLE_IDENTITY: &str = "00112233445566778899aabbccddeeff00010002";
pub const SAMPLE_MAC_STRING: &str = "aa:bb:cc:dd:ee:ff";

/// One interleaved report record carrying an iBeacon advertisement
pub fn ibeacon_record(
    mac: [u8; 6],
    uuid: [u8; 16],
    major: [u8; 2],
    minor: [u8; 2],
    tx_power: u8,
) -> Vec<u8> {
    let mut data = IBEACON_PREFIX.to_vec();
    data.extend_from_slice(&uuid);
    data.extend_from_slice(&major);
    data.extend_from_slice(&minor);
    data.push(tx_power);
    other_record(mac, &data)
}

pub fn sample_record() -> Vec<u8> {
    ibeacon_record(
        SAMPLE_MAC,
        SAMPLE_UUID,
        SAMPLE_MAJOR,
        SAMPLE_MINOR,
        SAMPLE_TX_POWER,
    )
}

/// One interleaved report record with arbitrary advertising data
pub fn other_record(mac: [u8; 6], data: &[u8]) -> Vec<u8> {
    let mut record = vec![ADV_NONCONN_IND, LE_PUBLIC_ADDRESS];
    record.extend_from_slice(&mac);
    record.push(data.len() as u8);
    record.extend_from_slice(data);
    record.push(0xB8); // RSSI
    record
}

/// A report window as the beacon recognizer sees it: count byte, then record
pub fn report_window(record: &[u8]) -> Vec<u8> {
    let mut window = vec![1];
    window.extend_from_slice(record);
    window
}

/// A complete LE Advertising Report event packet
pub fn advertising_packet(records: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = records.concat();
    let mut packet = vec![
        HCI_EVENT_PKT,
        EVT_LE_META_EVENT,
        (body.len() + 2) as u8,
        EVT_LE_ADVERTISING_REPORT,
        records.len() as u8,
    ];
    packet.extend_from_slice(&body);
    packet
}

pub fn sample_packet() -> Vec<u8> {
    advertising_packet(&[sample_record()])
}

/// A Command Complete event, the most common non-advertising traffic
pub fn command_complete_packet() -> Vec<u8> {
    vec![HCI_EVENT_PKT, 0x0E, 4, 1, 0x0C, 0x20, 0x00]
}
