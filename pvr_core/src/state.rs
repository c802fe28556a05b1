//! Lifecycle state shared by probe/remove/open/close handlers.
//!
//! One `LifecycleState` lives inside [`DriverCore`](crate::lifecycle::DriverCore)
//! and is lent to the attach controller and session gate for the duration of
//! each callback. Nothing here is global.

use pvr_common::device::{DrmHandle, PciDevice};
use serde::Serialize;

/// The device currently driven, with its display-framework handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundDevice {
    /// Physical device.
    pub device: PciDevice,
    /// Framework device object returned by the bind.
    pub handle: DrmHandle,
}

/// Module-level phase, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulePhase {
    /// Not loaded, or fully unloaded.
    #[default]
    Unloaded,
    /// Load sequence in progress.
    Loading,
    /// Loaded with an initialized device.
    Ready,
    /// Loaded, but no device attached.
    Inert,
    /// Load sequence failed; unload still required.
    Failed,
}

/// Mutable lifecycle state.
///
/// Invariants:
/// - `global_init_done` goes `false → true` at most once per residency and is
///   only cleared by [`reset`](Self::reset).
/// - `bound` holds at most one device.
/// - `session_count` equals the number of outstanding session tokens.
#[derive(Debug, Default)]
pub struct LifecycleState {
    pub(crate) global_init_done: bool,
    pub(crate) attach_succeeded: bool,
    pub(crate) bound: Option<BoundDevice>,
    /// Device the vendor services were globally initialized against.
    pub(crate) services_device: Option<PciDevice>,
    pub(crate) session_count: usize,
    pub(crate) phase: ModulePhase,
}

impl LifecycleState {
    /// Fresh state, as at module load.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once global device-services init has succeeded this residency.
    #[inline]
    pub fn global_init_done(&self) -> bool {
        self.global_init_done
    }

    /// True if at least one device completed attach.
    #[inline]
    pub fn attach_succeeded(&self) -> bool {
        self.attach_succeeded
    }

    /// Currently bound device.
    #[inline]
    pub fn bound(&self) -> Option<&BoundDevice> {
        self.bound.as_ref()
    }

    /// Number of open client sessions.
    #[inline]
    pub fn session_count(&self) -> usize {
        self.session_count
    }

    /// Module phase.
    #[inline]
    pub fn phase(&self) -> ModulePhase {
        self.phase
    }

    /// Return everything to load-time defaults. Only valid at full unload.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Serializable copy for reporting.
    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            phase: self.phase,
            global_init_done: self.global_init_done,
            attach_succeeded: self.attach_succeeded,
            bound_device: self.bound.map(|b| b.device),
            session_count: self.session_count,
        }
    }
}

/// Point-in-time view of [`LifecycleState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleSnapshot {
    /// Module phase.
    pub phase: ModulePhase,
    /// Global device-services init has run.
    pub global_init_done: bool,
    /// At least one device attached.
    pub attach_succeeded: bool,
    /// Currently bound device.
    pub bound_device: Option<PciDevice>,
    /// Open client sessions.
    pub session_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_clear() {
        let state = LifecycleState::new();
        assert!(!state.global_init_done());
        assert!(!state.attach_succeeded());
        assert!(state.bound().is_none());
        assert_eq!(state.session_count(), 0);
        assert_eq!(state.phase(), ModulePhase::Unloaded);
    }

    #[test]
    fn reset_clears_flags() {
        let mut state = LifecycleState::new();
        state.global_init_done = true;
        state.attach_succeeded = true;
        state.phase = ModulePhase::Ready;
        state.reset();

        let snap = state.snapshot();
        assert!(!snap.global_init_done);
        assert!(!snap.attach_succeeded);
        assert_eq!(snap.phase, ModulePhase::Unloaded);
    }

    #[test]
    fn snapshot_serializes() {
        let json = serde_json::to_string(&LifecycleState::new().snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"unloaded\""));
        assert!(json.contains("\"session_count\":0"));
    }
}
