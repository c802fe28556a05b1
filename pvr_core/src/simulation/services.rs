//! Simulated vendor services and trace capture.

use super::fault::{self, FaultPlan};
use super::journal::{Call, Journal};
use pvr_common::device::{FileHandle, PciDevice};
use pvr_common::error::Errno;
use pvr_common::services::{DeviceServices, TraceCapture};

/// Records every entry point and fails the ones the plan arms.
pub struct SimServices {
    faults: FaultPlan,
    journal: Journal,
}

impl SimServices {
    /// Services with `faults` armed.
    pub fn new(faults: &FaultPlan, journal: &Journal) -> Self {
        Self {
            faults: *faults,
            journal: journal.clone(),
        }
    }
}

impl DeviceServices for SimServices {
    fn driver_init(&mut self) -> Result<(), Errno> {
        self.journal.record(Call::DriverInit);
        fault::check(&mut self.faults.driver_init)
    }

    fn driver_deinit(&mut self) -> Result<(), Errno> {
        self.journal.record(Call::DriverDeinit);
        fault::check(&mut self.faults.driver_deinit)
    }

    fn global_init(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.journal.record(Call::GlobalInit(*device));
        fault::check(&mut self.faults.global_init)
    }

    fn global_deinit(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.journal.record(Call::GlobalDeinit(*device));
        fault::check(&mut self.faults.global_deinit)
    }

    fn device_init(&mut self) -> Result<(), Errno> {
        self.journal.record(Call::DeviceInit);
        fault::check(&mut self.faults.device_init)
    }

    fn device_deinit(&mut self) -> Result<(), Errno> {
        self.journal.record(Call::DeviceDeinit);
        fault::check(&mut self.faults.device_deinit)
    }

    fn open_session(&mut self, file: FileHandle) -> Result<(), Errno> {
        self.journal.record(Call::OpenSession(file));
        fault::check(&mut self.faults.open_session)
    }

    fn close_session(&mut self, file: FileHandle) -> Result<(), Errno> {
        self.journal.record(Call::CloseSession(file));
        fault::check(&mut self.faults.close_session)
    }

    fn suspend(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.journal.record(Call::Suspend(*device));
        Ok(())
    }

    fn resume(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.journal.record(Call::Resume(*device));
        Ok(())
    }

    fn shutdown(&mut self, device: &PciDevice) {
        self.journal.record(Call::Shutdown(*device));
    }
}

/// Trace capture that only records start and stop.
pub struct SimTrace {
    faults: FaultPlan,
    journal: Journal,
}

impl SimTrace {
    /// Trace capture with the plan's `trace_init` fault armed.
    pub fn new(faults: &FaultPlan, journal: &Journal) -> Self {
        Self {
            faults: *faults,
            journal: journal.clone(),
        }
    }
}

impl TraceCapture for SimTrace {
    fn init(&mut self) -> Result<(), Errno> {
        self.journal.record(Call::TraceInit);
        fault::check(&mut self.faults.trace_init)
    }

    fn cleanup(&mut self) {
        self.journal.record(Call::TraceCleanup);
    }
}
