//! Collaborator contracts.
//!
//! The lifecycle core never talks to hardware, the bus, or the display
//! framework directly. Everything outside the state machine is reached
//! through the traits below, which the host (or a simulation) implements:
//!
//! - [`BusFramework`] - driver registration with bus enumeration
//! - [`BusCallbacks`] - probe/remove/shutdown, implemented by the core and
//!   called back by the bus
//! - [`DisplayBinder`] - display-framework device allocation
//! - [`DeviceServices`] - vendor device-services entry points
//! - [`TraceCapture`] - optional debug/trace capture subsystem
//! - [`Residency`] - pins the driver binary while sessions are open
//!
//! # Error Convention
//!
//! Collaborators report failures as [`Errno`]. Deinit-style entry points
//! also return a `Result` so their failures can be logged, but the core
//! never lets them abort a teardown.

use crate::device::{DrmHandle, FileHandle, IdTable, PciDevice, PciDeviceId};
use crate::error::{Errno, LifecycleError};

/// Callbacks the bus framework invokes on the registered driver.
///
/// The host serializes these per device.
pub trait BusCallbacks {
    /// A device matching the ID table was discovered.
    ///
    /// `Ok(())` claims the device; an error leaves it unclaimed.
    fn probe(&mut self, device: &PciDevice, id: &PciDeviceId) -> Result<(), LifecycleError>;

    /// A previously claimed device is being detached. Cannot be refused.
    fn remove(&mut self, device: &PciDevice);

    /// The system is shutting down with the device still claimed.
    fn shutdown(&mut self, device: &PciDevice);
}

/// Bus enumeration framework.
pub trait BusFramework: Send {
    /// Register the driver under `name`.
    ///
    /// Synchronously probes every present device matching `table` through
    /// `callbacks` before returning.
    fn register_driver(
        &mut self,
        name: &str,
        table: &IdTable,
        callbacks: &mut dyn BusCallbacks,
    ) -> Result<(), Errno>;

    /// Deregister the driver, synchronously removing every device it claimed.
    fn deregister_driver(&mut self, callbacks: &mut dyn BusCallbacks);
}

/// Display/graphics framework device binder.
pub trait DisplayBinder: Send {
    /// Allocate and register a framework device object for `device`.
    fn bind_device(&mut self, device: &PciDevice, id: &PciDeviceId) -> Result<DrmHandle, Errno>;

    /// Release a framework device object.
    fn unbind_device(&mut self, handle: DrmHandle);
}

/// Vendor device-services layer.
///
/// The lifecycle core decides *when* each entry point runs; what they do
/// (memory management, firmware bring-up, command submission) is opaque.
pub trait DeviceServices: Send {
    /// Pre-registration setup, run before the bus driver is registered.
    fn driver_init(&mut self) -> Result<(), Errno>;

    /// Post-deregistration teardown.
    fn driver_deinit(&mut self) -> Result<(), Errno>;

    /// One-time global initialization against the first attached device.
    fn global_init(&mut self, device: &PciDevice) -> Result<(), Errno>;

    /// Global teardown for the attached device.
    fn global_deinit(&mut self, device: &PciDevice) -> Result<(), Errno>;

    /// Full device-level initialization, after attach.
    fn device_init(&mut self) -> Result<(), Errno>;

    /// Full device-level deinitialization.
    fn device_deinit(&mut self) -> Result<(), Errno>;

    /// Acquire per-session resources for `file`.
    fn open_session(&mut self, file: FileHandle) -> Result<(), Errno>;

    /// Release per-session resources for `file`.
    fn close_session(&mut self, file: FileHandle) -> Result<(), Errno>;

    /// Power-management suspend hook.
    fn suspend(&mut self, _device: &PciDevice) -> Result<(), Errno> {
        Ok(())
    }

    /// Power-management resume hook.
    fn resume(&mut self, _device: &PciDevice) -> Result<(), Errno> {
        Ok(())
    }

    /// System shutdown hook.
    fn shutdown(&mut self, _device: &PciDevice) {}
}

/// Debug/trace capture subsystem (PDUMP).
pub trait TraceCapture: Send {
    /// Start capture.
    fn init(&mut self) -> Result<(), Errno>;

    /// Stop capture and release its resources.
    fn cleanup(&mut self);
}

/// Residency pin on the driver binary.
///
/// Shared between the session gate and the host's unload path, hence `Sync`.
pub trait Residency: Send + Sync {
    /// Take one reference. Returns false if the binary is being unloaded.
    fn try_pin(&self) -> bool;

    /// Drop one reference taken by a successful [`try_pin`](Self::try_pin).
    fn unpin(&self);
}
