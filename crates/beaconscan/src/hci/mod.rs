//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides the event frame parser, the advertising report
//! decoder and the raw socket used to talk to the controller.

pub mod constants;
pub mod packet;
pub mod report;
pub mod socket;


pub use packet::{HciCommand, HciEventHeader, LeMetaEvent};
pub use report::{AdvertisingEventType, AdvertisingReportBatch, ReportWalk, ReportWindows};
pub use socket::{HciFilter, HciSocket, PacketTypeMask};
