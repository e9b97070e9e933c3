//! Discovery registry
//!
//! Maps a beacon identity key to the last MAC address it was seen from.

use crate::beacon::Beacon;
use std::collections::HashMap;

/// Beacons discovered during one scan session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRegistry {
    devices: HashMap<String, String>,
}

impl DiscoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting, overwriting the MAC stored for the same identity
    ///
    /// Returns `false` for unknown beacons, which are not recorded.
    pub fn record(&mut self, beacon: &Beacon) -> bool {
        match beacon {
            Beacon::Unknown => false,
            Beacon::IBeacon(ibeacon) => {
                self.devices.insert(ibeacon.unique_id(), ibeacon.mac_string());
                true
            }
        }
    }

    /// Copy of the current identity to MAC mapping
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.devices.clone()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.devices
    }

    pub fn get(&self, identity: &str) -> Option<&str> {
        self.devices.get(identity).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
