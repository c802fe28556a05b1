//! # PVR Core Library
//!
//! Attach/detach lifecycle controller for the PVR accelerator driver.
//!
//! The crate sequences module load and unload, device probe and remove, and
//! per-client session accounting around externally supplied collaborators
//! (bus framework, display framework, vendor device services, trace capture)
//! defined in `pvr_common::services`.
//!
//! # Module Structure
//!
//! - [`lifecycle`] - `DriverCore`, module load/unload orchestration
//! - [`attach`] - Per-device probe/remove state machine
//! - [`session`] - Session gate pinning driver residency
//! - [`services`] - Adapter over the vendor services entry points
//! - [`teardown`] - Always-run step runner and report
//! - [`residency`] - Module reference count
//! - [`state`] - Lifecycle flags and snapshot
//! - [`host`] - Thread-safe, errno-returning host surface
//! - [`simulation`] - Simulated collaborators with fault injection
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  HostDriver (Mutex)                                            │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │ DriverCore                                               │  │
//! │  │   LifecycleState ◄── AttachController ◄── BusFramework   │  │
//! │  │         ▲                  │                             │  │
//! │  │         │                  ▼                             │  │
//! │  │   SessionGate ──► ServicesAdapter ──► DeviceServices     │  │
//! │  │         │                                                │  │
//! │  └─────────┼────────────────────────────────────────────────┘  │
//! │            ▼                                                   │
//! │       ModuleRef (residency pins)                               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pvr_common::device::FileHandle;
//! use pvr_common::driver::DriverConfig;
//! use pvr_core::host::HostDriver;
//! use pvr_core::simulation::{FaultPlan, SimPlatform};
//!
//! let platform = SimPlatform::single_device(FaultPlan::default());
//! let host = HostDriver::new(&DriverConfig::default(), platform.collaborators()).unwrap();
//!
//! assert_eq!(host.module_load(), 0);
//! assert_eq!(host.open(FileHandle(1)), 0);
//! assert_eq!(host.release(FileHandle(1)), 0);
//! assert!(host.module_unload().unwrap().is_clean());
//! ```

#![warn(missing_docs)]

pub mod attach;
pub mod host;
pub mod lifecycle;
pub mod residency;
pub mod services;
pub mod session;
pub mod simulation;
pub mod state;
pub mod teardown;

// Re-export key types for convenience
pub use crate::host::HostDriver;
pub use crate::lifecycle::{Collaborators, DriverCore, LoadOutcome};
pub use crate::residency::{ModuleRef, ResidencyError};
pub use crate::state::{LifecycleSnapshot, ModulePhase};
pub use crate::teardown::TeardownReport;
