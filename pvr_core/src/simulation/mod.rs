//! Simulation collaborators.
//!
//! Software stand-ins for the host bus, display framework, vendor services
//! and trace capture, so the lifecycle core can be driven without hardware.
//! Every collaborator appends to a shared [`Journal`], and any entry point
//! can be made to fail through a [`FaultPlan`].
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "pvr-sim"
//!
//! [driver]
//! mode = "external"
//!
//! [[simulation.devices]]
//! bus = 1
//! slot = 0
//! vendor = 0x1010
//! device = 0x1cf0
//!
//! [simulation.faults]
//! bind = { errno = -16, times = 1 }
//! ```

mod bus;
mod display;
mod fault;
mod journal;
mod services;

pub use bus::SimBus;
pub use display::SimDisplay;
pub use fault::{Fault, FaultPlan};
pub use journal::{Call, Journal};
pub use services::{SimServices, SimTrace};

use crate::lifecycle::Collaborators;
use pvr_common::config::{ConfigError, ConfigLoader};
use pvr_common::consts::{IMG_VENDOR_ID, RGX_DEVICE_ID};
use pvr_common::device::PciDevice;
use pvr_common::driver::DriverConfig;
use serde::Deserialize;
use std::path::Path;

/// `[simulation]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Devices present on the simulated bus, in enumeration order.
    #[serde(default = "default_devices")]
    pub devices: Vec<PciDevice>,
    /// Injected collaborator failures.
    #[serde(default)]
    pub faults: FaultPlan,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            devices: default_devices(),
            faults: FaultPlan::default(),
        }
    }
}

fn default_devices() -> Vec<PciDevice> {
    vec![SimPlatform::rogue_device(0)]
}

/// Driver configuration plus the simulated platform it runs against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimConfig {
    /// Driver configuration.
    #[serde(flatten)]
    pub driver: DriverConfig,
    /// Simulated platform.
    #[serde(default)]
    pub simulation: SimulationSection,
}

impl SimConfig {
    /// Validate the driver part.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.driver.validate()
    }

    /// Load from `path`, or use built-in defaults if the file does not exist.
    ///
    /// The flag is `true` when defaults were used.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool), ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok((config, false)),
            Err(ConfigError::FileNotFound) => Ok((Self::default(), true)),
            Err(e) => Err(e),
        }
    }
}

/// A simulated machine: present devices, armed faults and the call log.
#[derive(Debug, Clone)]
pub struct SimPlatform {
    devices: Vec<PciDevice>,
    faults: FaultPlan,
    /// Calls made by every collaborator built from this platform.
    pub journal: Journal,
}

impl SimPlatform {
    /// Platform with the given devices.
    pub fn with_devices(devices: Vec<PciDevice>, faults: FaultPlan) -> Self {
        Self {
            devices,
            faults,
            journal: Journal::new(),
        }
    }

    /// Platform with one Rogue device at `01:00.0`.
    pub fn single_device(faults: FaultPlan) -> Self {
        Self::with_devices(vec![Self::rogue_device(0)], faults)
    }

    /// Platform described by a `[simulation]` table.
    pub fn from_section(section: &SimulationSection) -> Self {
        Self::with_devices(section.devices.clone(), section.faults)
    }

    /// A Rogue device in slot `slot` of bus 1.
    pub const fn rogue_device(slot: u8) -> PciDevice {
        PciDevice {
            bus: 1,
            slot,
            function: 0,
            vendor: IMG_VENDOR_ID,
            device: RGX_DEVICE_ID,
        }
    }

    /// Devices present on the bus.
    pub fn devices(&self) -> &[PciDevice] {
        &self.devices
    }

    /// Fresh collaborators sharing this platform's journal.
    ///
    /// Each call arms a fresh copy of the fault plan.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            bus: Box::new(SimBus::new(
                self.devices.clone(),
                self.faults.register,
                &self.journal,
            )),
            binder: Box::new(SimDisplay::new(&self.faults, &self.journal)),
            services: Box::new(SimServices::new(&self.faults, &self.journal)),
            trace: Some(Box::new(SimTrace::new(&self.faults, &self.journal))),
        }
    }
}
