//! PCI device descriptors and framework handles.
//!
//! The bus framework hands the driver a [`PciDevice`] together with the
//! [`PciDeviceId`] entry of the driver's [`IdTable`] that matched it. A
//! successful display-framework bind yields an opaque [`DrmHandle`]; client
//! sessions are keyed by [`FileHandle`].

use crate::consts::{IMG_VENDOR_ID, MAX_DEVICE_IDS, RGX_DEVICE1_ID, RGX_DEVICE_ID};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use std::fmt;

/// A `(vendor, device)` pair matched against discovered hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PciDeviceId {
    /// PCI vendor ID.
    pub vendor: u16,
    /// PCI device ID.
    pub device: u16,
}

impl PciDeviceId {
    /// Create a new identifier pair.
    pub const fn new(vendor: u16, device: u16) -> Self {
        Self { vendor, device }
    }

    /// Returns true if `dev` carries this vendor/device pair.
    #[inline]
    pub const fn matches(&self, dev: &PciDevice) -> bool {
        self.vendor == dev.vendor && self.device == dev.device
    }
}

impl fmt::Display for PciDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.device)
    }
}

/// Both board revisions of the Rogue device.
pub const ROGUE_IDS: [PciDeviceId; 2] = [
    PciDeviceId::new(IMG_VENDOR_ID, RGX_DEVICE_ID),
    PciDeviceId::new(IMG_VENDOR_ID, RGX_DEVICE1_ID),
];

const_assert!(ROGUE_IDS.len() <= MAX_DEVICE_IDS);

/// Fixed-capacity device-ID match table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdTable {
    entries: heapless::Vec<PciDeviceId, MAX_DEVICE_IDS>,
}

impl IdTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// The Rogue table: both board revisions of the IMG vendor.
    pub fn rogue() -> Result<Self, PciDeviceId> {
        Self::from_slice(&ROGUE_IDS)
    }

    /// Build a table from a slice.
    ///
    /// Returns the first entry that did not fit if the slice exceeds
    /// [`MAX_DEVICE_IDS`].
    pub fn from_slice(ids: &[PciDeviceId]) -> Result<Self, PciDeviceId> {
        let mut table = Self::new();
        for id in ids {
            table.push(*id)?;
        }
        Ok(table)
    }

    /// Append an entry. Returns the entry back if the table is full.
    pub fn push(&mut self, id: PciDeviceId) -> Result<(), PciDeviceId> {
        self.entries.push(id)
    }

    /// Find the entry matching `dev`, if any.
    pub fn match_device(&self, dev: &PciDevice) -> Option<&PciDeviceId> {
        self.entries.iter().find(|id| id.matches(dev))
    }

    /// Iterate over entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &PciDeviceId> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A discovered PCI function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PciDevice {
    /// Bus number.
    pub bus: u8,
    /// Slot (device) number on the bus.
    pub slot: u8,
    /// Function number.
    #[serde(default)]
    pub function: u8,
    /// PCI vendor ID.
    pub vendor: u16,
    /// PCI device ID.
    pub device: u16,
}

impl PciDevice {
    /// Identifier pair of this function.
    pub const fn id(&self) -> PciDeviceId {
        PciDeviceId::new(self.vendor, self.device)
    }
}

impl fmt::Display for PciDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0000:{:02x}:{:02x}.{} [{}]",
            self.bus,
            self.slot,
            self.function,
            self.id()
        )
    }
}

/// Opaque display-framework device handle returned by a successful bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrmHandle(u32);

impl DrmHandle {
    /// Wrap a framework minor number.
    pub const fn new(minor: u32) -> Self {
        Self(minor)
    }

    /// Framework minor number.
    pub const fn minor(self) -> u32 {
        self.0
    }
}

/// Client file handle identifying one open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileHandle(pub u64);

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}
