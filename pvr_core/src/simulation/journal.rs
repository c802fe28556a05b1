//! Shared call log for simulated collaborators.

use parking_lot::Mutex;
use pvr_common::device::{DrmHandle, FileHandle, PciDevice};
use serde::Serialize;
use std::sync::Arc;

/// One collaborator call, recorded before any injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "call", content = "arg", rename_all = "snake_case")]
pub enum Call {
    /// Trace capture started.
    TraceInit,
    /// Trace capture stopped.
    TraceCleanup,
    /// Vendor pre-registration setup.
    DriverInit,
    /// Vendor post-deregistration teardown.
    DriverDeinit,
    /// Bus driver registration.
    Register,
    /// Bus driver deregistration.
    Deregister,
    /// Bus invoked probe.
    Probe(PciDevice),
    /// Bus invoked remove.
    Remove(PciDevice),
    /// Display-framework bind.
    Bind(PciDevice),
    /// Display-framework unbind.
    Unbind(DrmHandle),
    /// Global services init.
    GlobalInit(PciDevice),
    /// Global services teardown.
    GlobalDeinit(PciDevice),
    /// Device-level init.
    DeviceInit,
    /// Device-level deinit.
    DeviceDeinit,
    /// Per-session resources acquired.
    OpenSession(FileHandle),
    /// Per-session resources released.
    CloseSession(FileHandle),
    /// Power-management suspend.
    Suspend(PciDevice),
    /// Power-management resume.
    Resume(PciDevice),
    /// System shutdown hook.
    Shutdown(PciDevice),
}

/// Cloneable handle to an append-only call log.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, call: Call) {
        self.0.lock().push(call);
    }

    /// Copy of every call so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call equal to `call`.
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.0.lock().iter().position(|c| c == call)
    }
}
