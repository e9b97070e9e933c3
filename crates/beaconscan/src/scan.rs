//! Bluetooth LE iBeacon scanning
//!
//! This module provides the scan loop that pulls packets from a transport,
//! decodes them and collects discovered iBeacons.

use crate::beacon::Beacon;
use crate::decode::decode_packet;
use crate::error::{HciError, ScanAborted};
use crate::hci::ReportWalk;
use crate::hex::to_hex_colon;
use crate::registry::DiscoveryRegistry;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Iterations of an interactive scan
pub const DEFAULT_SCAN_LOOP_COUNT: usize = 20;

/// Iterations of a bare `parse_events` call
pub const DEFAULT_PARSE_LOOP_COUNT: usize = 100;

/// Packet source and scan-mode switch of a Bluetooth adapter
pub trait HciTransport {
    /// Block until the next packet arrives
    ///
    /// `Ok(None)` means the source has terminated.
    fn read_packet(&mut self) -> Result<Option<Vec<u8>>, HciError>;

    fn enable_scan(&mut self) -> Result<(), HciError>;

    fn disable_scan(&mut self) -> Result<(), HciError>;
}

impl<T: HciTransport + ?Sized> HciTransport for &mut T {
    fn read_packet(&mut self) -> Result<Option<Vec<u8>>, HciError> {
        (**self).read_packet()
    }

    fn enable_scan(&mut self) -> Result<(), HciError> {
        (**self).enable_scan()
    }

    fn disable_scan(&mut self) -> Result<(), HciError> {
        (**self).disable_scan()
    }
}

/// Cooperative cancellation flag, checked before every blocking read
///
/// A cancellation ends the session in progress. [`DiscoveryService::scan`]
/// clears the flag when it starts, so a cancel issued between sessions is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Scan session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of packets read per session
    pub loop_count: usize,
    /// Dump every packet and decoded beacon at debug level
    pub debug: bool,
    pub report_walk: ReportWalk,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            loop_count: DEFAULT_SCAN_LOOP_COUNT,
            debug: false,
            report_walk: ReportWalk::Reference,
        }
    }
}

impl ScanConfig {
    /// Settings of the lower level parse routine
    pub fn parse_events() -> Self {
        Self {
            loop_count: DEFAULT_PARSE_LOOP_COUNT,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Why a scan loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// All iterations ran
    Completed,
    /// The transport reported end of stream
    SourceClosed,
    Cancelled,
    /// The transport failed; see [`ScanAborted`]
    Aborted,
}

/// Result of one scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Identity key to last seen MAC address
    pub discovered: HashMap<String, String>,
    pub packets: usize,
    /// iBeacon sightings, repeats included
    pub beacons: usize,
    pub unknown: usize,
    /// Packets and reports skipped as too short
    pub truncated: usize,
    pub termination: Termination,
}

#[derive(Debug, Default)]
struct Tally {
    packets: usize,
    beacons: usize,
    unknown: usize,
    truncated: usize,
}

impl Tally {
    fn finish(self, registry: DiscoveryRegistry, termination: Termination) -> ScanReport {
        ScanReport {
            discovered: registry.into_inner(),
            packets: self.packets,
            beacons: self.beacons,
            unknown: self.unknown,
            truncated: self.truncated,
            termination,
        }
    }
}

/// iBeacon discovery over an HCI transport
pub struct DiscoveryService<T: HciTransport> {
    transport: T,
    config: ScanConfig,
    state: ScanState,
    cancel: CancelToken,
}

impl<T: HciTransport> DiscoveryService<T> {
    pub fn new(transport: T, config: ScanConfig) -> Self {
        Self {
            transport,
            config,
            state: ScanState::Idle,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally held cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run one scan session: enable scanning, read `loop_count` packets,
    /// disable scanning
    ///
    /// Scanning is disabled again even when the loop aborts.
    pub fn scan(&mut self) -> Result<ScanReport, ScanAborted> {
        self.cancel.reset();

        info!("Enabling LE scan");
        if let Err(error) = self.transport.enable_scan() {
            return Err(ScanAborted {
                error,
                partial: Tally::default().finish(DiscoveryRegistry::new(), Termination::Aborted),
            });
        }
        self.state = ScanState::Scanning;

        let result = self.parse_events(self.config.loop_count);

        info!("Disabling LE scan");
        let disabled = self.transport.disable_scan();
        self.state = ScanState::Idle;

        match (result, disabled) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(mut report), Err(error)) => {
                report.termination = Termination::Aborted;
                Err(ScanAborted {
                    error,
                    partial: report,
                })
            }
            (Err(aborted), Err(e)) => {
                warn!("Failed to disable LE scan after abort: {}", e);
                Err(aborted)
            }
            (Err(aborted), Ok(())) => Err(aborted),
        }
    }

    /// Read and decode up to `loop_count` packets without touching scan mode
    pub fn parse_events(&mut self, loop_count: usize) -> Result<ScanReport, ScanAborted> {
        let mut registry = DiscoveryRegistry::new();
        let mut tally = Tally::default();
        let mut termination = Termination::Completed;

        for _ in 0..loop_count {
            if self.cancel.is_cancelled() {
                termination = Termination::Cancelled;
                break;
            }

            let packet = match self.transport.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    termination = Termination::SourceClosed;
                    break;
                }
                Err(error) => {
                    warn!("Scan aborted after {} packets: {}", tally.packets, error);
                    return Err(ScanAborted {
                        error,
                        partial: tally.finish(registry, Termination::Aborted),
                    });
                }
            };

            tally.packets += 1;
            self.process_packet(&packet, &mut registry, &mut tally);
        }

        info!(
            "Scan finished ({:?}): {} packets, {} beacons discovered",
            termination,
            tally.packets,
            registry.len()
        );
        Ok(tally.finish(registry, termination))
    }

    fn process_packet(&self, packet: &[u8], registry: &mut DiscoveryRegistry, tally: &mut Tally) {
        if self.config.debug {
            debug!("fullpacket: {}", to_hex_colon(packet));
        }

        let reports = match decode_packet(packet, self.config.report_walk) {
            Ok(reports) => reports,
            Err(e) => {
                debug!("Skipping packet: {}", e);
                tally.truncated += 1;
                return;
            }
        };

        for report in reports {
            match report.beacon {
                Ok(beacon) => {
                    match &beacon {
                        Beacon::IBeacon(ibeacon) => {
                            tally.beacons += 1;
                            if self.config.debug {
                                debug!("{} ({:?})", ibeacon, report.event_type);
                            }
                        }
                        Beacon::Unknown => tally.unknown += 1,
                    }
                    registry.record(&beacon);
                }
                Err(e) => {
                    debug!("Skipping report: {}", e);
                    tally.truncated += 1;
                }
            }

            if self.config.debug {
                debug!("=====");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_packets::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Enable,
        Read,
        Disable,
    }

    enum Scripted {
        Packet(Vec<u8>),
        Fail(std::io::ErrorKind),
        Closed,
    }

    #[derive(Default)]
    struct MockTransport {
        script: VecDeque<Scripted>,
        calls: Vec<Call>,
        fail_enable: bool,
        fail_disable: bool,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl MockTransport {
        fn with_packets(packets: Vec<Vec<u8>>) -> Self {
            Self {
                script: packets.into_iter().map(Scripted::Packet).collect(),
                ..Self::default()
            }
        }

        fn reads(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Read).count()
        }
    }

    impl HciTransport for MockTransport {
        fn read_packet(&mut self) -> Result<Option<Vec<u8>>, HciError> {
            self.calls.push(Call::Read);
            if let Some((after, token)) = &self.cancel_after {
                if self.reads() >= *after {
                    token.cancel();
                }
            }

            match self.script.pop_front() {
                Some(Scripted::Packet(packet)) => Ok(Some(packet)),
                Some(Scripted::Fail(kind)) => Err(HciError::ReceiveError(kind.into())),
                Some(Scripted::Closed) => Ok(None),
                // Idle radio: keep delivering unrelated traffic
                None => Ok(Some(command_complete_packet())),
            }
        }

        fn enable_scan(&mut self) -> Result<(), HciError> {
            self.calls.push(Call::Enable);
            if self.fail_enable {
                return Err(HciError::SendError(std::io::ErrorKind::BrokenPipe.into()));
            }
            Ok(())
        }

        fn disable_scan(&mut self) -> Result<(), HciError> {
            self.calls.push(Call::Disable);
            if self.fail_disable {
                return Err(HciError::SendError(std::io::ErrorKind::BrokenPipe.into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.loop_count, 20);
        assert!(!config.debug);
        assert_eq!(config.report_walk, ReportWalk::Reference);
        assert_eq!(ScanConfig::parse_events().loop_count, 100);
    }

    #[test]
    fn test_scan_discovers_beacon() {
        let transport = MockTransport::with_packets(vec![sample_packet()]);
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let report = service.scan().unwrap();

        assert_eq!(report.termination, Termination::Completed);
        assert_eq!(report.packets, 20);
        assert_eq!(report.beacons, 1);
        assert_eq!(report.discovered.len(), 1);
        assert_eq!(
            report.discovered.get(SAMPLE_IDENTITY).map(String::as_str),
            Some(SAMPLE_MAC_STRING)
        );
        assert_eq!(service.state(), ScanState::Idle);

        let calls = &service.transport().calls;
        assert_eq!(calls.first(), Some(&Call::Enable));
        assert_eq!(calls.last(), Some(&Call::Disable));
        assert_eq!(service.transport().reads(), 20);
    }

    #[test]
    fn test_parse_events_does_not_toggle_scan() {
        let transport = MockTransport::with_packets(vec![sample_packet(), sample_packet()]);
        let mut service = DiscoveryService::new(transport, ScanConfig::parse_events());

        let report = service.parse_events(5).unwrap();

        assert_eq!(service.state(), ScanState::Idle);
        assert_eq!(report.packets, 5);
        assert_eq!(report.beacons, 2);
        assert_eq!(report.discovered.len(), 1);
        assert!(service
            .transport()
            .calls
            .iter()
            .all(|call| *call == Call::Read));
    }

    #[test]
    fn test_repeated_sightings_keep_last_mac() {
        let moved = advertising_packet(&[ibeacon_record(
            [0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
            SAMPLE_UUID,
            SAMPLE_MAJOR,
            SAMPLE_MINOR,
            SAMPLE_TX_POWER,
        )]);
        let transport = MockTransport::with_packets(vec![sample_packet(), moved]);
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let report = service.parse_events(2).unwrap();

        assert_eq!(report.beacons, 2);
        assert_eq!(report.discovered.len(), 1);
        assert_eq!(
            report.discovered.get(SAMPLE_IDENTITY).map(String::as_str),
            Some("11:22:33:44:55:66")
        );
    }

    #[test]
    fn test_malformed_packets_are_skipped() {
        let mut short_report = sample_packet();
        short_report.truncate(25);
        let unknown = advertising_packet(&[other_record(SAMPLE_MAC, &[0u8; 31])]);

        let transport = MockTransport::with_packets(vec![
            vec![0x04],
            short_report,
            unknown,
            sample_packet(),
        ]);
        let config = ScanConfig {
            loop_count: 4,
            debug: true,
            ..ScanConfig::default()
        };
        let mut service = DiscoveryService::new(transport, config);

        let report = service.scan().unwrap();

        assert_eq!(report.termination, Termination::Completed);
        assert_eq!(report.packets, 4);
        assert_eq!(report.truncated, 2);
        assert_eq!(report.unknown, 1);
        assert_eq!(report.beacons, 1);
        assert_eq!(report.discovered.len(), 1);
    }

    #[test]
    fn test_transport_error_keeps_partial_results() {
        let mut transport = MockTransport::with_packets(vec![sample_packet()]);
        transport
            .script
            .push_back(Scripted::Fail(std::io::ErrorKind::BrokenPipe));
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let aborted = service.scan().unwrap_err();

        assert!(matches!(aborted.error, HciError::ReceiveError(_)));
        assert_eq!(aborted.partial.termination, Termination::Aborted);
        assert_eq!(aborted.partial.packets, 1);
        assert_eq!(
            aborted.partial.discovered.get(SAMPLE_IDENTITY).map(String::as_str),
            Some(SAMPLE_MAC_STRING)
        );
        assert_eq!(service.state(), ScanState::Idle);
        assert_eq!(service.transport().calls.last(), Some(&Call::Disable));
    }

    #[test]
    fn test_timeout_is_a_transport_error() {
        let mut transport = MockTransport::default();
        transport
            .script
            .push_back(Scripted::Fail(std::io::ErrorKind::TimedOut));
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let aborted = service.parse_events(10).unwrap_err();
        assert!(aborted.error.is_timeout());
        assert!(aborted.partial.discovered.is_empty());
    }

    #[test]
    fn test_source_closed_ends_session() {
        let mut transport = MockTransport::with_packets(vec![sample_packet()]);
        transport.script.push_back(Scripted::Closed);
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let report = service.scan().unwrap();

        assert_eq!(report.termination, Termination::SourceClosed);
        assert_eq!(report.packets, 1);
        assert_eq!(report.discovered.len(), 1);
        assert_eq!(service.transport().calls.last(), Some(&Call::Disable));
    }

    #[test]
    fn test_cancel_before_next_read() {
        let token = CancelToken::new();
        let transport = MockTransport {
            cancel_after: Some((3, token.clone())),
            ..MockTransport::with_packets(vec![sample_packet()])
        };
        let mut service =
            DiscoveryService::new(transport, ScanConfig::default()).with_cancel_token(token);

        let report = service.scan().unwrap();

        assert_eq!(report.termination, Termination::Cancelled);
        assert_eq!(report.packets, 3);
        assert_eq!(service.transport().reads(), 3);
        assert_eq!(report.discovered.len(), 1);
    }

    #[test]
    fn test_scan_after_cancelled_session() {
        let token = CancelToken::new();
        let transport = MockTransport {
            cancel_after: Some((1, token.clone())),
            ..MockTransport::with_packets(vec![sample_packet()])
        };
        let mut service =
            DiscoveryService::new(transport, ScanConfig::default()).with_cancel_token(token);

        let first = service.scan().unwrap();
        assert_eq!(first.termination, Termination::Cancelled);
        assert_eq!(first.packets, 1);

        service.transport.cancel_after = None;
        let second = service.scan().unwrap();
        assert_eq!(second.termination, Termination::Completed);
        assert_eq!(second.packets, 20);
        assert!(!service.cancel_token().is_cancelled());
    }

    #[test]
    fn test_cancel_token_reset() {
        let token = CancelToken::new();
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!shared.is_cancelled());
    }

    #[test]
    fn test_enable_failure_aborts_before_reading() {
        let transport = MockTransport {
            fail_enable: true,
            ..MockTransport::with_packets(vec![sample_packet()])
        };
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let aborted = service.scan().unwrap_err();

        assert!(matches!(aborted.error, HciError::SendError(_)));
        assert_eq!(aborted.partial.packets, 0);
        assert_eq!(service.transport().reads(), 0);
        assert_eq!(service.state(), ScanState::Idle);
    }

    #[test]
    fn test_disable_failure_reports_full_results() {
        let transport = MockTransport {
            fail_disable: true,
            ..MockTransport::with_packets(vec![sample_packet()])
        };
        let mut service = DiscoveryService::new(transport, ScanConfig::default());

        let aborted = service.scan().unwrap_err();

        assert!(matches!(aborted.error, HciError::SendError(_)));
        assert_eq!(aborted.partial.packets, 20);
        assert_eq!(aborted.partial.discovered.len(), 1);
    }

    #[test]
    fn test_borrowed_transport() {
        let mut transport = MockTransport::with_packets(vec![sample_packet()]);
        let report = DiscoveryService::new(&mut transport, ScanConfig::default())
            .parse_events(1)
            .unwrap();

        assert_eq!(report.discovered.len(), 1);
        assert_eq!(transport.reads(), 1);
    }
}
