//! LE Advertising Report decoding
//!
//! An advertising report batch starts with a one byte report count. Each
//! report window handed out by [`ReportWindows`] keeps that leading byte (or,
//! for later reports, the byte just before the record) at index 0, so the
//! fixed beacon offsets are the same for every window.

use crate::error::DecodeError;
use crate::hci::constants::*;
use crate::hci::packet::LeMetaEvent;
use serde::Deserialize;

/// Bytes before the advertising data in an interleaved report record:
/// event type, address type, address and data length
const REPORT_RECORD_HEADER: usize = 9;

/// How report windows are located inside a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportWalk {
    /// Every report reuses the window at the start of the batch. With more
    /// than one report, the later reports decode the first record again.
    #[default]
    Reference,
    /// Advance past each `[event_type, address_type, address, len, data, rssi]`
    /// record before decoding the next.
    Sequential,
}

/// Advertising event type of a single report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingEventType {
    ConnectableUndirected,
    ConnectableDirected,
    ScannableUndirected,
    NonConnectableUndirected,
    ScanResponse,
    Other(u8),
}

impl From<u8> for AdvertisingEventType {
    fn from(value: u8) -> Self {
        match value {
            ADV_IND => AdvertisingEventType::ConnectableUndirected,
            ADV_DIRECT_IND => AdvertisingEventType::ConnectableDirected,
            ADV_SCAN_IND => AdvertisingEventType::ScannableUndirected,
            ADV_NONCONN_IND => AdvertisingEventType::NonConnectableUndirected,
            ADV_SCAN_RSP => AdvertisingEventType::ScanResponse,
            other => AdvertisingEventType::Other(other),
        }
    }
}

impl AdvertisingEventType {
    /// Read the event type of the report held in `window`
    pub fn of_window(window: &[u8]) -> Option<Self> {
        window.get(1).copied().map(Self::from)
    }
}

/// The reports carried by one LE Advertising Report sub-event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingReportBatch<'a> {
    pub num_reports: u8,
    /// Sub-event payload, starting with the report count byte
    pub payload: &'a [u8],
}

impl<'a> AdvertisingReportBatch<'a> {
    /// Parse the batch carried by `meta`
    ///
    /// Returns `Ok(None)` for any sub-event other than Advertising Report.
    pub fn try_parse(meta: &LeMetaEvent<'a>) -> Result<Option<Self>, DecodeError> {
        if !meta.is_advertising_report() {
            return Ok(None);
        }

        let num_reports = *meta
            .payload
            .first()
            .ok_or_else(|| DecodeError::truncated("advertising report count", 1, 0))?;

        Ok(Some(Self {
            num_reports,
            payload: meta.payload,
        }))
    }

    /// Iterate over the report windows of this batch
    pub fn reports(&self, walk: ReportWalk) -> ReportWindows<'a> {
        ReportWindows {
            payload: self.payload,
            walk,
            remaining: self.num_reports,
            cursor: 1,
        }
    }
}

/// Iterator over the report windows of a batch
///
/// Yields one item per declared report. In sequential mode a record that
/// runs past the payload yields a truncation error and ends the iteration.
#[derive(Debug, Clone)]
pub struct ReportWindows<'a> {
    payload: &'a [u8],
    walk: ReportWalk,
    remaining: u8,
    // start of the next record, sequential mode only
    cursor: usize,
}

impl<'a> ReportWindows<'a> {
    fn next_sequential(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.cursor;
        let data_len = *self
            .payload
            .get(start + REPORT_RECORD_HEADER - 1)
            .ok_or_else(|| {
                DecodeError::truncated(
                    "advertising report record",
                    start + REPORT_RECORD_HEADER,
                    self.payload.len(),
                )
            })? as usize;

        // header, data and the trailing RSSI byte
        let end = start + REPORT_RECORD_HEADER + data_len + 1;
        let window = self.payload.get(start - 1..end).ok_or_else(|| {
            DecodeError::truncated("advertising report record", end, self.payload.len())
        })?;

        self.cursor = end;
        Ok(window)
    }
}

impl<'a> Iterator for ReportWindows<'a> {
    type Item = Result<&'a [u8], DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.walk {
            ReportWalk::Reference => Some(Ok(self.payload)),
            ReportWalk::Sequential => {
                let result = self.next_sequential();
                if result.is_err() {
                    self.remaining = 0;
                }
                Some(result)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self.remaining as usize;
        match self.walk {
            ReportWalk::Reference => (upper, Some(upper)),
            ReportWalk::Sequential => (upper.min(1), Some(upper)),
        }
    }
}
