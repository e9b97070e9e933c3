//! Error types for the beaconscan library
//!
//! Transport failures (`HciError`) end a scan session. Decode failures
//! (`DecodeError`) only ever cost the packet or report that caused them.

use crate::scan::ScanReport;
use thiserror::Error;

/// Errors that can occur when working with HCI sockets
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to send HCI command: {0}")]
    SendError(std::io::Error),

    #[error("Failed to receive HCI event: {0}")]
    ReceiveError(std::io::Error),

    #[error("Failed to read HCI socket filter: {0}")]
    GetFilterError(std::io::Error),

    #[error("Failed to set HCI socket filter: {0}")]
    SetFilterError(std::io::Error),
}

impl HciError {
    /// Whether this error is a read timeout rather than a broken transport
    pub fn is_timeout(&self) -> bool {
        matches!(self, HciError::ReceiveError(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}

/// Errors raised while decoding a packet that is shorter than its fixed layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated {context}: need {needed} bytes, have {available}")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },
}

impl DecodeError {
    pub(crate) fn truncated(context: &'static str, needed: usize, available: usize) -> Self {
        DecodeError::Truncated {
            context,
            needed,
            available,
        }
    }
}

/// A scan session that stopped on a transport failure
///
/// The beacons discovered before the failure are kept in `partial`.
#[derive(Error, Debug)]
#[error("Scan aborted after {} packets: {}", .partial.packets, .error)]
pub struct ScanAborted {
    #[source]
    pub error: HciError,
    pub partial: ScanReport,
}
