//! BeaconScan - iBeacon discovery over Bluetooth HCI
//!
//! This library reads raw HCI event packets from a Bluetooth adapter, decodes
//! LE Advertising Reports, recognizes iBeacon advertisements and collects the
//! discovered beacons keyed by their UUID, major and minor values.
//!
//! The decode chain ([`decode_packet`], [`recognize`], [`DiscoveryRegistry`])
//! is independent of any socket. [`DiscoveryService`] drives it from any
//! [`HciTransport`], of which [`HciSocket`] is the Linux raw socket one.

pub mod beacon;
pub mod decode;
pub mod error;
pub mod hci;
pub mod hex;
pub mod registry;
pub mod scan;

#[cfg(test)]
mod test_packets;

// Re-export common types for convenience
pub use beacon::{recognize, Beacon, BeaconType, IBeacon};
pub use decode::{decode_packet, DecodedReport};
pub use error::{DecodeError, HciError, ScanAborted};
pub use hci::{HciFilter, HciSocket, ReportWalk};
pub use registry::DiscoveryRegistry;
pub use scan::{
    CancelToken, DiscoveryService, HciTransport, ScanConfig, ScanReport, ScanState, Termination,
};
