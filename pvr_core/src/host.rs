//! Host-facing driver surface.
//!
//! `HostDriver` is what the host calls: every entry point returns a host
//! error code (`0` on success, negative errno on failure) and takes `&self`,
//! so the driver can be shared between host threads. The lifecycle core and
//! the per-file session table sit behind a single `parking_lot::Mutex`, which
//! serializes every transition.
//!
//! Module residency is tracked by a [`ModuleRef`] owned alongside the core:
//! sessions pin it, and [`HostDriver::module_unload`] refuses to start while
//! any pin is held.

use crate::lifecycle::{Collaborators, DriverCore};
use crate::residency::{ModuleRef, ResidencyError};
use crate::session::SessionToken;
use crate::state::LifecycleSnapshot;
use crate::teardown::TeardownReport;
use parking_lot::Mutex;
use pvr_common::config::ConfigError;
use pvr_common::device::{FileHandle, PciDevice, PciDeviceId};
use pvr_common::driver::DriverConfig;
use pvr_common::error::{Errno, to_host_code};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

struct Inner {
    core: DriverCore,
    sessions: HashMap<FileHandle, SessionToken>,
}

/// Thread-safe host capability surface.
pub struct HostDriver {
    inner: Mutex<Inner>,
    module: Arc<ModuleRef>,
}

impl HostDriver {
    /// Build the driver around `parts`.
    pub fn new(config: &DriverConfig, parts: Collaborators) -> Result<Self, ConfigError> {
        let module = Arc::new(ModuleRef::new());
        let core = DriverCore::new(config, parts, module.clone())?;
        Ok(Self {
            inner: Mutex::new(Inner {
                core,
                sessions: HashMap::new(),
            }),
            module,
        })
    }

    /// Module init entry point.
    pub fn module_load(&self) -> i32 {
        let mut inner = self.inner.lock();
        if self.module.revive() {
            debug!("module reloaded");
        }
        to_host_code(inner.core.load())
    }

    /// Module exit entry point.
    ///
    /// # Errors
    /// The host refuses to unload while sessions pin the module.
    pub fn module_unload(&self) -> Result<TeardownReport, ResidencyError> {
        let mut inner = self.inner.lock();
        self.module.begin_unload().inspect_err(|e| {
            warn!("module unload refused: {}", e);
        })?;

        let report = inner.core.unload();
        self.module.finish_unload();
        Ok(report)
    }

    /// Bus probe callback.
    pub fn probe(&self, device: &PciDevice, id: &PciDeviceId) -> i32 {
        to_host_code(self.inner.lock().core.probe(device, id))
    }

    /// Bus remove callback.
    pub fn remove(&self, device: &PciDevice) {
        self.inner.lock().core.remove(device);
    }

    /// Bus shutdown callback.
    pub fn shutdown(&self, device: &PciDevice) {
        self.inner.lock().core.shutdown(device);
    }

    /// Device-node open.
    pub fn open(&self, file: FileHandle) -> i32 {
        let mut inner = self.inner.lock();
        if inner.sessions.contains_key(&file) {
            warn!("open {}: session already open", file);
            return Errno::EBUSY.to_errno();
        }

        match inner.core.open(file) {
            Ok(token) => {
                inner.sessions.insert(file, token);
                0
            }
            Err(e) => e.to_errno(),
        }
    }

    /// Device-node release. Always succeeds.
    pub fn release(&self, file: FileHandle) -> i32 {
        let mut inner = self.inner.lock();
        match inner.sessions.remove(&file) {
            Some(token) => inner.core.close(token),
            None => warn!("release {}: no open session, ignored", file),
        }
        0
    }

    /// Power-management suspend.
    pub fn suspend(&self, device: &PciDevice) -> i32 {
        errno_code(self.inner.lock().core.suspend(device))
    }

    /// Power-management resume.
    pub fn resume(&self, device: &PciDevice) -> i32 {
        errno_code(self.inner.lock().core.resume(device))
    }

    /// Lifecycle state view.
    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.inner.lock().core.snapshot()
    }

    /// Residency pins currently held.
    pub fn module_refs(&self) -> usize {
        self.module.refcount()
    }
}

fn errno_code(result: Result<(), Errno>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.to_errno(),
    }
}
