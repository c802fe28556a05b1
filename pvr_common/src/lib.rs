//! PVR Common Library
//!
//! Shared types for the PVR driver lifecycle workspace: everything the
//! lifecycle core and the host-side collaborators must agree on.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and shared fields
//! - [`consts`] - Driver names, PCI identifiers and fixed capacities
//! - [`device`] - PCI device descriptors, ID table, framework handles
//! - [`driver`] - Driver configuration (deployment mode, support flags)
//! - [`error`] - `Errno` and `LifecycleError`
//! - [`services`] - Collaborator contracts (bus, display, vendor services)
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pvr_common::prelude::*;
//!
//! let table = IdTable::from_slice(&[PciDeviceId::new(IMG_VENDOR_ID, RGX_DEVICE_ID)]).unwrap();
//! assert_eq!(table.len(), 1);
//! ```

pub mod config;
pub mod consts;
pub mod device;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod services;
