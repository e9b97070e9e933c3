//! beaconscancli - scan for iBeacons on a local Bluetooth adapter
//!
//! Opening a raw HCI socket needs root or CAP_NET_RAW.

mod config;

use beaconscan::{DiscoveryService, HciError, HciFilter, HciSocket, ScanAborted, ScanReport};
use chrono::Local;
use clap::Parser;
use config::{CliArgs, CliConfig};
use fern::Dispatch;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Error, Debug)]
enum RunError {
    #[error("Failed to set up logging: {0}")]
    Logging(#[from] log::SetLoggerError),

    #[error(transparent)]
    Hci(#[from] HciError),

    #[error(transparent)]
    Aborted(#[from] ScanAborted),
}

fn setup_logging(config: &CliConfig) -> Result<(), log::SetLoggerError> {
    Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                msg
            ))
        })
        .level(config.level_filter())
        .chain(std::io::stderr())
        .apply()
}

fn print_discovered(report: &ScanReport) {
    let mut devices: Vec<_> = report.discovered.iter().collect();
    devices.sort();
    for (identity, mac) in devices {
        println!("{} {}", identity, mac);
    }
}

fn run(config: &CliConfig) -> Result<ScanReport, RunError> {
    let mut socket = HciSocket::open(config.device)?;
    socket.set_read_timeout(config.read_timeout());

    let saved_filter = socket.filter()?;
    socket.set_filter(&HciFilter::all_events())?;

    let result = DiscoveryService::new(&mut socket, config.scan).scan();

    if let Err(e) = socket.set_filter(&saved_filter) {
        log::warn!("Failed to restore HCI socket filter: {}", e);
    }

    Ok(result?)
}

fn main() -> ExitCode {
    let config = match CliArgs::parse().resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = setup_logging(&config) {
        eprintln!("{}", RunError::from(e));
        return ExitCode::FAILURE;
    }

    log::info!(
        "Scanning hci{} for {} packets",
        config.device,
        config.scan.loop_count
    );

    match run(&config) {
        Ok(report) => {
            print_discovered(&report);
            ExitCode::SUCCESS
        }
        Err(RunError::Aborted(aborted)) => {
            print_discovered(&aborted.partial);
            log::error!("{}", aborted);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
