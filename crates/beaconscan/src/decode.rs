//! Packet to beacon decode chain
//!
//! Event header, LE Meta Event, advertising report batch, then one beacon per
//! report window. Nothing here touches a transport.

use crate::beacon::{recognize, Beacon};
use crate::error::DecodeError;
use crate::hci::{
    AdvertisingEventType, AdvertisingReportBatch, HciEventHeader, LeMetaEvent, ReportWalk,
};
use crate::registry::DiscoveryRegistry;

/// Outcome of one report window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReport {
    pub event_type: Option<AdvertisingEventType>,
    pub beacon: Result<Beacon, DecodeError>,
}

/// Decode every report carried by a raw packet
///
/// Packets that are not LE Advertising Reports decode to no reports. A
/// packet too short for its envelope is an error; a report too short for the
/// beacon layout is reported in its own [`DecodedReport`].
pub fn decode_packet(packet: &[u8], walk: ReportWalk) -> Result<Vec<DecodedReport>, DecodeError> {
    let (header, remainder) = HciEventHeader::split(packet)?;

    let Some(meta) = LeMetaEvent::try_parse(&header, remainder)? else {
        return Ok(Vec::new());
    };

    let Some(batch) = AdvertisingReportBatch::try_parse(&meta)? else {
        return Ok(Vec::new());
    };

    Ok(batch
        .reports(walk)
        .map(|window| match window {
            Ok(window) => DecodedReport {
                event_type: AdvertisingEventType::of_window(window),
                beacon: recognize(window),
            },
            Err(e) => DecodedReport {
                event_type: None,
                beacon: Err(e),
            },
        })
        .collect())
}

impl DiscoveryRegistry {
    /// Decode a raw packet and record every beacon it carries
    ///
    /// Returns the number of beacons recorded. Truncated reports are skipped.
    pub fn ingest(&mut self, packet: &[u8], walk: ReportWalk) -> Result<usize, DecodeError> {
        let reports = decode_packet(packet, walk)?;
        Ok(reports
            .iter()
            .filter_map(|report| report.beacon.as_ref().ok())
            .filter(|beacon| self.record(beacon))
            .count())
    }
}
