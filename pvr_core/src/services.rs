//! Device Services Adapter.
//!
//! Thin call-through to the vendor [`DeviceServices`] entry points. The
//! adapter translates collaborator `Errno`s into [`LifecycleError`]s on the
//! init side and turns every deinit-side failure into a logged
//! [`StepOutcome`], so callers on teardown paths cannot propagate it by
//! accident.
//!
//! Guarding is the caller's job: `global_init` performs no idempotency check.

use crate::teardown::StepOutcome;
use pvr_common::device::{FileHandle, PciDevice};
use pvr_common::error::{Errno, LifecycleError};
use pvr_common::services::DeviceServices;
use tracing::{debug, trace, warn};

/// Wrapper over the vendor services layer.
pub struct ServicesAdapter {
    services: Box<dyn DeviceServices>,
}

impl ServicesAdapter {
    /// Wrap a services implementation.
    pub fn new(services: Box<dyn DeviceServices>) -> Self {
        Self { services }
    }

    /// Pre-registration setup.
    pub fn driver_init(&mut self) -> Result<(), LifecycleError> {
        trace!("services: driver_init");
        self.services
            .driver_init()
            .map_err(LifecycleError::ServicesSetupFailed)
    }

    /// Post-deregistration teardown.
    pub fn driver_deinit(&mut self) -> StepOutcome {
        trace!("services: driver_deinit");
        logged("driver_deinit", self.services.driver_deinit())
    }

    /// Global initialization against `device`.
    ///
    /// Must only be called while the global-init flag is clear.
    pub fn global_init(&mut self, device: &PciDevice) -> Result<(), LifecycleError> {
        debug!("services: global_init for {}", device);
        self.services
            .global_init(device)
            .map_err(LifecycleError::DeviceInitFailed)
    }

    /// Global teardown for `device`. Best-effort.
    pub fn global_deinit(&mut self, device: &PciDevice) -> StepOutcome {
        debug!("services: global_deinit for {}", device);
        logged("global_deinit", self.services.global_deinit(device))
    }

    /// Full device-level initialization.
    pub fn device_init(&mut self) -> Result<(), LifecycleError> {
        trace!("services: device_init");
        self.services
            .device_init()
            .map_err(LifecycleError::DeviceInitFailed)
    }

    /// Full device-level deinitialization. Best-effort.
    pub fn device_deinit(&mut self) -> StepOutcome {
        trace!("services: device_deinit");
        logged("device_deinit", self.services.device_deinit())
    }

    /// Acquire per-session resources.
    pub fn open_session(&mut self, file: FileHandle) -> Result<(), Errno> {
        self.services.open_session(file)
    }

    /// Release per-session resources. Best-effort.
    pub fn close_session(&mut self, file: FileHandle) -> StepOutcome {
        logged("close_session", self.services.close_session(file))
    }

    /// Power-management suspend.
    pub fn suspend(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.services.suspend(device)
    }

    /// Power-management resume.
    pub fn resume(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.services.resume(device)
    }

    /// System shutdown hook.
    pub fn shutdown(&mut self, device: &PciDevice) {
        self.services.shutdown(device);
    }
}

fn logged(op: &'static str, outcome: StepOutcome) -> StepOutcome {
    if let Err(e) = outcome {
        warn!("services: {} reported {}, ignored", op, e);
    }
    outcome
}
