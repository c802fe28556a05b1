//! Simulated display framework.

use super::fault::{self, Fault, FaultPlan};
use super::journal::{Call, Journal};
use pvr_common::device::{DrmHandle, PciDevice, PciDeviceId};
use pvr_common::error::Errno;
use pvr_common::services::DisplayBinder;
use tracing::trace;

/// Hands out sequential minor numbers.
pub struct SimDisplay {
    next_minor: u32,
    bind_fault: Option<Fault>,
    journal: Journal,
}

impl SimDisplay {
    /// Binder with the plan's `bind` fault armed.
    pub fn new(faults: &FaultPlan, journal: &Journal) -> Self {
        Self {
            next_minor: 0,
            bind_fault: faults.bind,
            journal: journal.clone(),
        }
    }
}

impl DisplayBinder for SimDisplay {
    fn bind_device(&mut self, device: &PciDevice, _id: &PciDeviceId) -> Result<DrmHandle, Errno> {
        self.journal.record(Call::Bind(*device));
        fault::check(&mut self.bind_fault)?;

        let handle = DrmHandle::new(self.next_minor);
        self.next_minor += 1;
        trace!("display: {} bound as card{}", device, handle.minor());
        Ok(handle)
    }

    fn unbind_device(&mut self, handle: DrmHandle) {
        self.journal.record(Call::Unbind(handle));
    }
}
