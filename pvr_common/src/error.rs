//! Error types shared between the lifecycle core and its collaborators.
//!
//! This module defines:
//! - `Errno` - Host error code returned by collaborators (negative, kernel convention)
//! - `LifecycleError` - Failures surfaced by the lifecycle state machine

use thiserror::Error;

/// Negative host error code.
///
/// Collaborators report failures with the host's errno convention. The
/// value is always stored negative so it can be handed back to the host
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("errno {0}")]
pub struct Errno(i32);

impl Errno {
    /// No such file or directory.
    pub const ENOENT: Self = Self(-libc::ENOENT);
    /// I/O error.
    pub const EIO: Self = Self(-libc::EIO);
    /// Out of memory.
    pub const ENOMEM: Self = Self(-libc::ENOMEM);
    /// Device or resource busy.
    pub const EBUSY: Self = Self(-libc::EBUSY);
    /// No such device.
    pub const ENODEV: Self = Self(-libc::ENODEV);
    /// Invalid argument.
    pub const EINVAL: Self = Self(-libc::EINVAL);

    /// Build from a raw code. Positive codes are negated; zero maps to `-EINVAL`
    /// since zero means success to the host.
    pub const fn from_code(code: i32) -> Self {
        if code > 0 {
            Self(-code)
        } else if code == 0 {
            Self::EINVAL
        } else {
            Self(code)
        }
    }

    /// The negative code handed back to the host.
    #[inline]
    pub const fn to_errno(self) -> i32 {
        self.0
    }
}

/// Failures of the driver lifecycle.
///
/// Variants that wrap an [`Errno`] carry the collaborator's code so it can be
/// returned to the host unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Debug/trace capture subsystem failed to start.
    #[error("trace subsystem init failed: {0}")]
    TraceInitFailed(Errno),

    /// Vendor services pre-registration setup failed.
    #[error("vendor services setup failed: {0}")]
    ServicesSetupFailed(Errno),

    /// Bus framework refused driver registration.
    #[error("bus driver registration failed: {0}")]
    RegistrationFailed(Errno),

    /// Display framework rejected the device bind.
    #[error("device bind rejected: {0}")]
    BindFailed(Errno),

    /// Vendor global or per-device initialization failed.
    #[error("device services initialization failed: {0}")]
    DeviceInitFailed(Errno),

    /// Device initialization attempted with no successful attach.
    #[error("no device bound")]
    NoDeviceBound,

    /// A device is already bound; only one is driven at a time.
    #[error("a device is already bound")]
    AlreadyBound,

    /// Load requested while the module is loaded; unload must run first.
    #[error("module already loaded")]
    AlreadyLoaded,

    /// Session open attempted while the driver is unloading.
    #[error("driver residency unavailable")]
    ResidencyUnavailable,

    /// Per-session resource acquisition failed.
    #[error("session open failed: {0}")]
    SessionOpenFailed(Errno),
}

impl LifecycleError {
    /// Map to the host's errno convention.
    pub const fn to_errno(self) -> i32 {
        match self {
            Self::TraceInitFailed(e)
            | Self::ServicesSetupFailed(e)
            | Self::RegistrationFailed(e)
            | Self::BindFailed(e)
            | Self::SessionOpenFailed(e) => e.to_errno(),
            Self::DeviceInitFailed(_) | Self::NoDeviceBound => Errno::ENODEV.to_errno(),
            Self::AlreadyBound | Self::AlreadyLoaded => Errno::EBUSY.to_errno(),
            Self::ResidencyUnavailable => Errno::ENOENT.to_errno(),
        }
    }
}

/// Collapse a lifecycle result into a host return code.
pub fn to_host_code<T>(result: Result<T, LifecycleError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.to_errno(),
    }
}
