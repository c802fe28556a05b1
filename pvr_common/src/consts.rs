//! Driver-wide constants.
//!
//! Single source of truth for registration names, PCI identifiers and
//! fixed capacities. Imported by all crates; never duplicate these values.

/// Name used to register the driver with the bus framework.
pub const DEFAULT_DRIVER_NAME: &str = "pvrsrvkm";

/// Imagination Technologies PCI vendor ID.
pub const IMG_VENDOR_ID: u16 = 0x1010;

/// Primary Rogue device ID.
pub const RGX_DEVICE_ID: u16 = 0x1cf0;

/// Secondary Rogue device ID (second board revision).
pub const RGX_DEVICE1_ID: u16 = 0x1cf1;

/// Capacity of the device-ID match table.
pub const MAX_DEVICE_IDS: usize = 8;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pvr/driver.toml";
