//! Prelude module for common re-exports.
//!
//! ```rust
//! use pvr_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::driver::{DeployMode, DriverConfig, SupportFlags};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{
    DEFAULT_DRIVER_NAME, IMG_VENDOR_ID, MAX_DEVICE_IDS, RGX_DEVICE1_ID, RGX_DEVICE_ID,
};

// ─── Devices ────────────────────────────────────────────────────────
pub use crate::device::{DrmHandle, FileHandle, IdTable, PciDevice, PciDeviceId, ROGUE_IDS};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{Errno, LifecycleError, to_host_code};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::services::{
    BusCallbacks, BusFramework, DeviceServices, DisplayBinder, Residency, TraceCapture,
};
