//! Driver configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "pvr-rogue-0"
//!
//! [driver]
//! name = "pvrsrvkm"
//! mode = "integrated"
//!
//! [driver.support]
//! pdump = true
//!
//! [[device_ids]]
//! vendor = 0x1010
//! device = 0x1cf0
//! ```

use crate::config::{ConfigError, LogLevel, SharedConfig};
use crate::consts::{DEFAULT_DRIVER_NAME, MAX_DEVICE_IDS};
use crate::device::{IdTable, PciDeviceId, ROGUE_IDS};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where global device-services initialization sits in the probe path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// The display framework owns the device; bind first, then run global
    /// init from the bind's load path.
    #[default]
    Integrated,
    /// The vendor layer must be ready before the framework claims the
    /// device; global init runs before the bind is delegated.
    External,
}

bitflags! {
    /// Optional driver features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SupportFlags: u8 {
        /// Debug/trace capture subsystem is started on load.
        const PDUMP        = 0x01;
        /// Load fails with `NoDeviceBound` instead of staying inert when no
        /// device attached.
        const STRICT_PROBE = 0x02;
    }
}

impl Default for SupportFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// `[driver.support]` table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupportConfig {
    /// Start the trace capture subsystem.
    #[serde(default)]
    pub pdump: bool,
    /// Treat a load with no attached device as a failure.
    #[serde(default)]
    pub strict_probe: bool,
}

impl SupportConfig {
    /// Fold the table into a flag set.
    pub fn flags(&self) -> SupportFlags {
        let mut flags = SupportFlags::empty();
        flags.set(SupportFlags::PDUMP, self.pdump);
        flags.set(SupportFlags::STRICT_PROBE, self.strict_probe);
        flags
    }
}

/// `[driver]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverSection {
    /// Bus registration name.
    #[serde(default = "default_driver_name")]
    pub name: String,
    /// Deployment mode.
    #[serde(default)]
    pub mode: DeployMode,
    /// Optional features.
    #[serde(default)]
    pub support: SupportConfig,
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            name: default_driver_name(),
            mode: DeployMode::default(),
            support: SupportConfig::default(),
        }
    }
}

fn default_driver_name() -> String {
    DEFAULT_DRIVER_NAME.to_string()
}

fn default_device_ids() -> Vec<PciDeviceId> {
    ROGUE_IDS.to_vec()
}

/// Complete driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Common fields.
    pub shared: SharedConfig,
    /// Driver behaviour.
    #[serde(default)]
    pub driver: DriverSection,
    /// Device-ID match table.
    #[serde(default = "default_device_ids")]
    pub device_ids: Vec<PciDeviceId>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "pvr".to_string(),
            },
            driver: DriverSection::default(),
            device_ids: default_device_ids(),
        }
    }
}

impl DriverConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` or `driver.name` is empty
    /// - `device_ids` is empty, has duplicates, or exceeds [`MAX_DEVICE_IDS`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.driver.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver.name cannot be empty".to_string(),
            ));
        }
        if self.device_ids.is_empty() {
            return Err(ConfigError::ValidationError(
                "device_ids must list at least one device".to_string(),
            ));
        }
        if self.device_ids.len() > MAX_DEVICE_IDS {
            return Err(ConfigError::ValidationError(format!(
                "device_ids has {} entries (max {MAX_DEVICE_IDS})",
                self.device_ids.len()
            )));
        }

        let mut seen = HashSet::new();
        for id in &self.device_ids {
            if !seen.insert(id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate device id {id}"
                )));
            }
        }
        Ok(())
    }

    /// Build the match table.
    pub fn id_table(&self) -> Result<IdTable, ConfigError> {
        IdTable::from_slice(&self.device_ids).map_err(|id| {
            ConfigError::ValidationError(format!("device id {id} exceeds table capacity"))
        })
    }

    /// Enabled optional features.
    pub fn support_flags(&self) -> SupportFlags {
        self.driver.support.flags()
    }
}
