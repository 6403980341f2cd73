//! Device identity types shared by the enumerator and the dock logic

use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;

/// Identifier of one USB device model/revision
///
/// Canonical form is `VID-PID-bcdDevice-bcdUSB`, each field four upper-case
/// hex digits (e.g. `1A2B-0001-0100-0200`). Comparison is exact string
/// equality; ids read from configuration are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an id string as-is
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the canonical id from descriptor fields
    pub fn from_parts(vendor_id: u16, product_id: u16, bcd_device: u16, bcd_usb: u16) -> Self {
        Self(format!(
            "{:04X}-{:04X}-{:04X}-{:04X}",
            vendor_id, product_id, bcd_device, bcd_usb
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id has the canonical four-field hex shape
    pub fn is_canonical(&self) -> bool {
        let parts: Vec<&str> = self.0.split('-').collect();
        parts.len() == 4
            && parts.iter().all(|p| {
                p.len() == 4
                    && p.chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One snapshot of attached devices
///
/// Captured once per poll and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSet {
    devices: HashSet<DeviceId>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, DeviceId> {
        self.devices.iter()
    }

    /// True if any of `ids` is present in this snapshot
    pub fn intersects(&self, ids: &[DeviceId]) -> bool {
        ids.iter().any(|id| self.devices.contains(id))
    }

    /// Devices present here but not in `previous`, sorted for stable logs
    pub fn added_since<'a>(&'a self, previous: &'a DeviceSet) -> Vec<&'a DeviceId> {
        let mut added: Vec<&DeviceId> = self.devices.difference(&previous.devices).collect();
        added.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        added
    }

    /// Devices present in `previous` but gone here, sorted for stable logs
    pub fn removed_since<'a>(&'a self, previous: &'a DeviceSet) -> Vec<&'a DeviceId> {
        previous.added_since(self)
    }
}

impl FromIterator<DeviceId> for DeviceSet {
    fn from_iter<I: IntoIterator<Item = DeviceId>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DeviceSet {
    type Item = &'a DeviceId;
    type IntoIter = hash_set::Iter<'a, DeviceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
