//! Attach Controller.
//!
//! Drives per-device probe/remove on behalf of the bus framework.
//!
//! # Probe State Machine
//!
//! ```text
//!   Unbound ──probe──► Probing ──bind + global init ok──► Bound
//!                         │
//!                         └──── any step failed ────────► Failed
//!   Bound ──remove──► Unbound
//! ```
//!
//! Global device-services initialization runs inside the probe path, at most
//! once per residency, keyed by the global-init flag. [`DeployMode`] decides
//! whether it runs after the display-framework bind (`Integrated`) or before
//! it (`External`). A probe that fails after partial progress rolls that
//! progress back before returning:
//!
//! | Mode       | Failure after        | Rollback                          |
//! |------------|----------------------|-----------------------------------|
//! | Integrated | bind ok, init failed | unbind; init flag stays clear     |
//! | External   | init ok, bind failed | none; services stay initialized   |
//!
//! In the `External` case the initialized services are released at unload.

use crate::services::ServicesAdapter;
use crate::state::{BoundDevice, LifecycleState};
use pvr_common::device::{DrmHandle, PciDevice, PciDeviceId};
use pvr_common::driver::DeployMode;
use pvr_common::error::LifecycleError;
use pvr_common::services::{BusCallbacks, DisplayBinder};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Probe state of one candidate device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachState {
    /// Never probed, or removed.
    #[default]
    Unbound,
    /// Probe in progress.
    Probing,
    /// Probe succeeded; device is driven.
    Bound,
    /// Probe failed; device left unclaimed.
    Failed,
}

/// Per-device probe/remove logic.
#[derive(Debug)]
pub struct AttachController {
    mode: DeployMode,
    candidates: HashMap<PciDevice, AttachState>,
}

impl AttachController {
    /// Controller for the given deployment mode.
    pub fn new(mode: DeployMode) -> Self {
        Self {
            mode,
            candidates: HashMap::new(),
        }
    }

    /// Deployment mode.
    pub fn mode(&self) -> DeployMode {
        self.mode
    }

    /// Probe state of `device`.
    pub fn attach_state(&self, device: &PciDevice) -> AttachState {
        self.candidates.get(device).copied().unwrap_or_default()
    }

    /// Probe `device`.
    ///
    /// # Errors
    /// - `AlreadyBound` if another device is driven; nothing is touched
    /// - `BindFailed` with the framework's errno unchanged
    /// - `DeviceInitFailed` if global init failed
    pub fn probe(
        &mut self,
        state: &mut LifecycleState,
        binder: &mut dyn DisplayBinder,
        services: &mut ServicesAdapter,
        device: &PciDevice,
        id: &PciDeviceId,
    ) -> Result<(), LifecycleError> {
        if let Some(bound) = state.bound {
            warn!(
                "probe {}: {} already bound, single device only",
                device, bound.device
            );
            return Err(LifecycleError::AlreadyBound);
        }

        debug!("probe {} (matched {}, {:?})", device, id, self.mode);
        self.candidates.insert(*device, AttachState::Probing);

        let result = match self.mode {
            DeployMode::Integrated => Self::bind_then_init(state, binder, services, device, id),
            DeployMode::External => Self::init_then_bind(state, binder, services, device, id),
        };

        match result {
            Ok(handle) => {
                state.bound = Some(BoundDevice {
                    device: *device,
                    handle,
                });
                state.attach_succeeded = true;
                self.candidates.insert(*device, AttachState::Bound);
                info!("probe {}: bound as minor {}", device, handle.minor());
                Ok(())
            }
            Err(e) => {
                self.candidates.insert(*device, AttachState::Failed);
                error!("probe {} failed: {}", device, e);
                Err(e)
            }
        }
    }

    fn bind_then_init(
        state: &mut LifecycleState,
        binder: &mut dyn DisplayBinder,
        services: &mut ServicesAdapter,
        device: &PciDevice,
        id: &PciDeviceId,
    ) -> Result<DrmHandle, LifecycleError> {
        let handle = binder
            .bind_device(device, id)
            .map_err(LifecycleError::BindFailed)?;

        if !state.global_init_done {
            if let Err(e) = services.global_init(device) {
                binder.unbind_device(handle);
                return Err(e);
            }
            state.global_init_done = true;
            state.services_device = Some(*device);
        }
        Ok(handle)
    }

    fn init_then_bind(
        state: &mut LifecycleState,
        binder: &mut dyn DisplayBinder,
        services: &mut ServicesAdapter,
        device: &PciDevice,
        id: &PciDeviceId,
    ) -> Result<DrmHandle, LifecycleError> {
        if !state.global_init_done {
            services.global_init(device)?;
            state.global_init_done = true;
            state.services_device = Some(*device);
        }

        binder
            .bind_device(device, id)
            .map_err(LifecycleError::BindFailed)
    }

    /// Detach `device`. Always completes.
    ///
    /// Releases global services held for the device, clears the bound
    /// handle, then unbinds from the display framework. Release errors are
    /// logged only.
    pub fn remove(
        &mut self,
        state: &mut LifecycleState,
        binder: &mut dyn DisplayBinder,
        services: &mut ServicesAdapter,
        device: &PciDevice,
    ) {
        let Some(bound) = state.bound.filter(|b| b.device == *device) else {
            debug!("remove {}: not bound, ignored", device);
            self.candidates.remove(device);
            return;
        };

        if state.services_device == Some(*device) {
            state.services_device = None;
            let _ = services.global_deinit(device);
        }
        state.bound = None;
        binder.unbind_device(bound.handle);
        self.candidates.insert(*device, AttachState::Unbound);
        info!("remove {}: unbound", device);
    }

    /// Full device-level initialization.
    ///
    /// # Errors
    /// `NoDeviceBound` without touching the services layer if no device
    /// attached; `DeviceInitFailed` if the services layer failed.
    pub fn init_device(
        &self,
        state: &LifecycleState,
        services: &mut ServicesAdapter,
    ) -> Result<(), LifecycleError> {
        if !state.attach_succeeded {
            return Err(LifecycleError::NoDeviceBound);
        }
        services.device_init()
    }

    /// Forget per-device history. Called at full unload.
    pub(crate) fn clear(&mut self) {
        self.candidates.clear();
    }
}

/// Bus callbacks bound to the pieces of [`DriverCore`](crate::lifecycle::DriverCore)
/// they need, borrowed for the duration of one bus call.
pub struct ProbeContext<'a> {
    /// Controller.
    pub attach: &'a mut AttachController,
    /// Lifecycle state.
    pub state: &'a mut LifecycleState,
    /// Display framework.
    pub binder: &'a mut dyn DisplayBinder,
    /// Vendor services.
    pub services: &'a mut ServicesAdapter,
}

impl BusCallbacks for ProbeContext<'_> {
    fn probe(&mut self, device: &PciDevice, id: &PciDeviceId) -> Result<(), LifecycleError> {
        self.attach
            .probe(self.state, self.binder, self.services, device, id)
    }

    fn remove(&mut self, device: &PciDevice) {
        self.attach
            .remove(self.state, self.binder, self.services, device);
    }

    fn shutdown(&mut self, device: &PciDevice) {
        debug!("shutdown {}", device);
        self.services.shutdown(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Call, Fault, FaultPlan, Journal, SimDisplay, SimServices};
    use pvr_common::consts::{IMG_VENDOR_ID, RGX_DEVICE1_ID, RGX_DEVICE_ID};
    use pvr_common::error::Errno;

    fn device(device: u16) -> PciDevice {
        PciDevice {
            bus: 1,
            slot: device as u8,
            function: 0,
            vendor: IMG_VENDOR_ID,
            device,
        }
    }

    struct Fixture {
        attach: AttachController,
        state: LifecycleState,
        binder: SimDisplay,
        services: ServicesAdapter,
        journal: Journal,
    }

    impl Fixture {
        fn new(mode: DeployMode, faults: FaultPlan) -> Self {
            let journal = Journal::new();
            Self {
                attach: AttachController::new(mode),
                state: LifecycleState::new(),
                binder: SimDisplay::new(&faults, &journal),
                services: ServicesAdapter::new(Box::new(SimServices::new(&faults, &journal))),
                journal,
            }
        }

        fn probe(&mut self, dev: &PciDevice) -> Result<(), LifecycleError> {
            let id = dev.id();
            self.attach
                .probe(&mut self.state, &mut self.binder, &mut self.services, dev, &id)
        }

        fn remove(&mut self, dev: &PciDevice) {
            self.attach
                .remove(&mut self.state, &mut self.binder, &mut self.services, dev);
        }
    }

    #[test]
    fn integrated_probe_binds_then_inits() {
        let mut f = Fixture::new(DeployMode::Integrated, FaultPlan::default());
        let dev = device(RGX_DEVICE_ID);

        f.probe(&dev).unwrap();

        assert_eq!(f.attach.attach_state(&dev), AttachState::Bound);
        assert!(f.state.attach_succeeded());
        assert!(f.state.global_init_done());
        assert_eq!(f.state.bound().map(|b| b.device), Some(dev));
        assert_eq!(
            f.journal.calls(),
            vec![Call::Bind(dev), Call::GlobalInit(dev)]
        );
    }

    #[test]
    fn external_probe_inits_then_binds() {
        let mut f = Fixture::new(DeployMode::External, FaultPlan::default());
        let dev = device(RGX_DEVICE_ID);

        f.probe(&dev).unwrap();
        assert_eq!(
            f.journal.calls(),
            vec![Call::GlobalInit(dev), Call::Bind(dev)]
        );
    }

    #[test]
    fn bind_failure_returns_framework_errno_unchanged() {
        let mut f = Fixture::new(
            DeployMode::Integrated,
            FaultPlan {
                bind: Some(Fault::always(Errno::from_code(-123))),
                ..FaultPlan::default()
            },
        );
        let dev = device(RGX_DEVICE_ID);

        let err = f.probe(&dev).unwrap_err();
        assert_eq!(err, LifecycleError::BindFailed(Errno::from_code(-123)));
        assert_eq!(err.to_errno(), -123);
        assert_eq!(f.attach.attach_state(&dev), AttachState::Failed);
        assert!(!f.state.attach_succeeded());
        assert!(!f.state.global_init_done());
        assert!(f.state.bound().is_none());
    }

    #[test]
    fn integrated_init_failure_unbinds_and_allows_retry() {
        let mut f = Fixture::new(
            DeployMode::Integrated,
            FaultPlan {
                global_init: Some(Fault::times(Errno::ENODEV, 1)),
                ..FaultPlan::default()
            },
        );
        let dev = device(RGX_DEVICE_ID);

        assert!(matches!(
            f.probe(&dev),
            Err(LifecycleError::DeviceInitFailed(_))
        ));
        assert!(!f.state.global_init_done());
        assert!(f.state.bound().is_none());
        assert_eq!(f.journal.count(|c| matches!(c, Call::Unbind(_))), 1);

        // Second probe retries global init and succeeds.
        f.probe(&dev).unwrap();
        assert!(f.state.global_init_done());
        assert_eq!(f.journal.count(|c| matches!(c, Call::GlobalInit(_))), 2);
    }

    #[test]
    fn external_bind_failure_keeps_services_initialized() {
        let mut f = Fixture::new(
            DeployMode::External,
            FaultPlan {
                bind: Some(Fault::times(Errno::EBUSY, 1)),
                ..FaultPlan::default()
            },
        );
        let a = device(RGX_DEVICE_ID);
        let b = device(RGX_DEVICE1_ID);

        assert!(f.probe(&a).is_err());
        assert!(f.state.global_init_done());
        assert!(!f.state.attach_succeeded());

        // The next candidate binds without a second global init.
        f.probe(&b).unwrap();
        assert_eq!(f.journal.count(|c| matches!(c, Call::GlobalInit(_))), 1);
        assert_eq!(f.state.bound().map(|x| x.device), Some(b));
    }

    #[test]
    fn second_device_is_refused() {
        let mut f = Fixture::new(DeployMode::Integrated, FaultPlan::default());
        let a = device(RGX_DEVICE_ID);
        let b = device(RGX_DEVICE1_ID);

        f.probe(&a).unwrap();
        assert_eq!(f.probe(&b), Err(LifecycleError::AlreadyBound));
        assert_eq!(f.state.bound().map(|x| x.device), Some(a));
        assert_eq!(f.attach.attach_state(&b), AttachState::Unbound);
        assert_eq!(f.journal.count(|c| matches!(c, Call::Bind(_))), 1);
    }

    #[test]
    fn remove_deinits_clears_and_unbinds() {
        let mut f = Fixture::new(DeployMode::Integrated, FaultPlan::default());
        let dev = device(RGX_DEVICE_ID);
        f.probe(&dev).unwrap();
        let handle = f.state.bound().unwrap().handle;

        f.remove(&dev);

        assert!(f.state.bound().is_none());
        assert_eq!(f.attach.attach_state(&dev), AttachState::Unbound);
        assert_eq!(
            f.journal.calls()[2..],
            [Call::GlobalDeinit(dev), Call::Unbind(handle)]
        );
        // Global init is once per residency.
        assert!(f.state.global_init_done());
    }

    #[test]
    fn remove_completes_when_global_deinit_fails() {
        let mut f = Fixture::new(
            DeployMode::Integrated,
            FaultPlan {
                global_deinit: Some(Fault::always(Errno::EIO)),
                ..FaultPlan::default()
            },
        );
        let dev = device(RGX_DEVICE_ID);
        f.probe(&dev).unwrap();

        f.remove(&dev);

        assert!(f.state.bound().is_none());
        assert_eq!(f.journal.count(|c| matches!(c, Call::Unbind(_))), 1);
    }

    #[test]
    fn remove_of_unbound_device_is_ignored() {
        let mut f = Fixture::new(DeployMode::Integrated, FaultPlan::default());
        f.remove(&device(RGX_DEVICE_ID));
        assert!(f.journal.is_empty());
    }

    #[test]
    fn init_device_requires_attach() {
        let mut f = Fixture::new(DeployMode::Integrated, FaultPlan::default());

        assert_eq!(
            f.attach.init_device(&f.state, &mut f.services),
            Err(LifecycleError::NoDeviceBound)
        );
        assert!(f.journal.is_empty());

        f.probe(&device(RGX_DEVICE_ID)).unwrap();
        assert!(f.attach.init_device(&f.state, &mut f.services).is_ok());
        assert_eq!(f.journal.count(|c| matches!(c, Call::DeviceInit)), 1);
    }
}
