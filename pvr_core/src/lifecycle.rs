//! Lifecycle Orchestrator.
//!
//! `DriverCore` owns the lifecycle state and every collaborator, and runs
//! the module load and unload sequences.
//!
//! # Load (fail-fast)
//!
//! | Step | Action                                   | Failure                 |
//! |------|------------------------------------------|-------------------------|
//! | 1    | Trace capture init (PDUMP only)          | `TraceInitFailed`       |
//! | 2    | Vendor pre-registration setup            | `ServicesSetupFailed`   |
//! | 3    | Bus registration (probes devices)        | `RegistrationFailed`    |
//! | 4    | No device attached → load inert, success | `NoDeviceBound` (strict)|
//! | 5    | Device init                              | `DeviceInitFailed`      |
//!
//! A failed load is not rolled back; the host runs unload, which copes with
//! partially-loaded state.
//!
//! # Unload (fail-soft)
//!
//! Device deinit → bus deregistration (removes the bound device) → vendor
//! teardown → trace cleanup. Every step runs regardless of earlier outcomes.

use crate::attach::{AttachController, AttachState, ProbeContext};
use crate::services::ServicesAdapter;
use crate::session::{SessionGate, SessionToken};
use crate::state::{LifecycleSnapshot, LifecycleState, ModulePhase};
use crate::teardown::{Teardown, TeardownReport};
use pvr_common::config::ConfigError;
use pvr_common::device::{FileHandle, IdTable, PciDevice, PciDeviceId};
use pvr_common::driver::{DriverConfig, SupportFlags};
use pvr_common::error::{Errno, LifecycleError};
use pvr_common::services::{
    BusCallbacks, BusFramework, DeviceServices, DisplayBinder, Residency, TraceCapture,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collaborators handed to [`DriverCore::new`].
pub struct Collaborators {
    /// Bus enumeration framework.
    pub bus: Box<dyn BusFramework>,
    /// Display framework device binder.
    pub binder: Box<dyn DisplayBinder>,
    /// Vendor device services.
    pub services: Box<dyn DeviceServices>,
    /// Trace capture; required when PDUMP support is enabled.
    pub trace: Option<Box<dyn TraceCapture>>,
}

/// Successful load result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// A device attached and was fully initialized.
    Ready,
    /// No device attached; the module stays loaded and idle.
    Inert,
}

/// Top-level driver lifecycle.
pub struct DriverCore {
    name: String,
    table: IdTable,
    support: SupportFlags,
    state: LifecycleState,
    attach: AttachController,
    sessions: SessionGate,
    services: ServicesAdapter,
    bus: Box<dyn BusFramework>,
    binder: Box<dyn DisplayBinder>,
    trace: Option<Box<dyn TraceCapture>>,
    trace_started: bool,
}

impl DriverCore {
    /// Create a core from validated configuration.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` if the configuration is invalid or PDUMP
    /// is enabled without a trace capture collaborator.
    pub fn new(
        config: &DriverConfig,
        parts: Collaborators,
        residency: Arc<dyn Residency>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let support = config.support_flags();
        if support.contains(SupportFlags::PDUMP) && parts.trace.is_none() {
            return Err(ConfigError::ValidationError(
                "pdump enabled but no trace capture provided".to_string(),
            ));
        }

        info!(
            "DriverCore '{}' created: {} device ids, mode={:?}, support={:?}",
            config.driver.name,
            config.device_ids.len(),
            config.driver.mode,
            support
        );

        Ok(Self {
            name: config.driver.name.clone(),
            table: config.id_table()?,
            support,
            state: LifecycleState::new(),
            attach: AttachController::new(config.driver.mode),
            sessions: SessionGate::new(residency),
            services: ServicesAdapter::new(parts.services),
            bus: parts.bus,
            binder: parts.binder,
            trace: parts.trace,
            trace_started: false,
        })
    }

    /// Run the module load sequence.
    ///
    /// # Errors
    /// `AlreadyLoaded` unless the module is unloaded; otherwise the first
    /// failing step's error, and later steps do not run.
    pub fn load(&mut self) -> Result<LoadOutcome, LifecycleError> {
        if self.state.phase != ModulePhase::Unloaded {
            warn!(
                "{}: load refused, module is {:?}",
                self.name, self.state.phase
            );
            return Err(LifecycleError::AlreadyLoaded);
        }

        info!("{}: loading", self.name);
        self.state.phase = ModulePhase::Loading;

        let result = self.run_load();
        self.state.phase = match result {
            Ok(LoadOutcome::Ready) => ModulePhase::Ready,
            Ok(LoadOutcome::Inert) => ModulePhase::Inert,
            Err(ref e) => {
                error!("{}: load failed: {}", self.name, e);
                ModulePhase::Failed
            }
        };
        result
    }

    fn run_load(&mut self) -> Result<LoadOutcome, LifecycleError> {
        if self.support.contains(SupportFlags::PDUMP) {
            if let Some(trace) = self.trace.as_mut() {
                trace.init().map_err(LifecycleError::TraceInitFailed)?;
                self.trace_started = true;
                debug!("{}: trace capture started", self.name);
            }
        }

        self.services.driver_init()?;

        let mut callbacks = ProbeContext {
            attach: &mut self.attach,
            state: &mut self.state,
            binder: self.binder.as_mut(),
            services: &mut self.services,
        };
        self.bus
            .register_driver(&self.name, &self.table, &mut callbacks)
            .map_err(|e| {
                error!("{}: unable to register bus driver ({})", self.name, e);
                LifecycleError::RegistrationFailed(e)
            })?;

        if !self.state.attach_succeeded {
            if self.support.contains(SupportFlags::STRICT_PROBE) {
                return Err(LifecycleError::NoDeviceBound);
            }
            // Permissive: matching hardware may be absent or discovered later.
            info!(
                "{}: probe has not been called or did not succeed, check that hardware is detected",
                self.name
            );
            return Ok(LoadOutcome::Inert);
        }

        self.attach.init_device(&self.state, &mut self.services)?;
        info!("{}: device initialized", self.name);
        Ok(LoadOutcome::Ready)
    }

    /// Run the module unload sequence. Every step is attempted.
    pub fn unload(&mut self) -> TeardownReport {
        info!("{}: unloading", self.name);
        let mut teardown = Teardown::new("unload");

        teardown.step("device_deinit", || self.services.device_deinit());

        teardown.step("bus_deregister", || {
            let mut callbacks = ProbeContext {
                attach: &mut self.attach,
                state: &mut self.state,
                binder: self.binder.as_mut(),
                services: &mut self.services,
            };
            self.bus.deregister_driver(&mut callbacks);

            // A device attached outside registration (hot-plug) may not be
            // tracked by the bus.
            if let Some(bound) = callbacks.state.bound {
                warn!(
                    "{}: {} still bound after deregistration, removing",
                    self.name, bound.device
                );
                callbacks.remove(&bound.device);
            }
            Ok(())
        });

        teardown.step("services_teardown", || {
            // Services initialized against a device that never bound are
            // still held here.
            let held = self
                .state
                .services_device
                .take()
                .map_or(Ok(()), |dev| self.services.global_deinit(&dev));
            let deinit = self.services.driver_deinit();
            held.and(deinit)
        });

        match self.trace.as_mut() {
            Some(trace) if self.trace_started => {
                teardown.step("trace_cleanup", || {
                    trace.cleanup();
                    Ok(())
                });
                self.trace_started = false;
            }
            _ => {
                teardown.skip("trace_cleanup");
            }
        }

        if self.state.session_count > 0 {
            warn!(
                "{}: unloading with {} open sessions",
                self.name, self.state.session_count
            );
        }
        self.state.reset();
        self.attach.clear();

        let report = teardown.finish();
        info!(
            "{}: unloaded ({} of {} steps clean)",
            self.name,
            report.len() - report.failures().count(),
            report.len()
        );
        report
    }

    /// Probe callback for a device discovered after registration.
    pub fn probe(&mut self, device: &PciDevice, id: &PciDeviceId) -> Result<(), LifecycleError> {
        self.attach.probe(
            &mut self.state,
            self.binder.as_mut(),
            &mut self.services,
            device,
            id,
        )
    }

    /// Remove callback.
    pub fn remove(&mut self, device: &PciDevice) {
        self.attach.remove(
            &mut self.state,
            self.binder.as_mut(),
            &mut self.services,
            device,
        );
    }

    /// Shutdown callback.
    pub fn shutdown(&mut self, device: &PciDevice) {
        self.services.shutdown(device);
    }

    /// Open a client session.
    pub fn open(&mut self, file: FileHandle) -> Result<SessionToken, LifecycleError> {
        self.sessions.open(&mut self.state, &mut self.services, file)
    }

    /// Close a client session.
    pub fn close(&mut self, token: SessionToken) {
        self.sessions.close(&mut self.state, &mut self.services, token);
    }

    /// Power-management suspend, delegated to the services layer.
    pub fn suspend(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.services.suspend(device)
    }

    /// Power-management resume, delegated to the services layer.
    pub fn resume(&mut self, device: &PciDevice) -> Result<(), Errno> {
        self.services.resume(device)
    }

    /// Lifecycle state.
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Serializable state view.
    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.state.snapshot()
    }

    /// Probe state of `device`.
    pub fn attach_state(&self, device: &PciDevice) -> AttachState {
        self.attach.attach_state(device)
    }

    /// Bus registration name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
