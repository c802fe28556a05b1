//! Fault injection for simulated collaborators.
//!
//! ```toml
//! [simulation.faults]
//! bind = { errno = -16, times = 1 }   # first bind fails with EBUSY
//! device_init = { errno = 5 }         # every device init fails with EIO
//! ```

use pvr_common::error::Errno;
use serde::{Deserialize, Serialize};

/// An error a simulated entry point returns instead of succeeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fault {
    /// Host error code. Positive values are negated.
    pub errno: i32,
    /// Number of calls that fail before the entry point recovers.
    /// `None` fails forever.
    #[serde(default)]
    pub times: Option<u32>,
}

impl Fault {
    /// Fail every call.
    pub const fn always(errno: Errno) -> Self {
        Self {
            errno: errno.to_errno(),
            times: None,
        }
    }

    /// Fail the next `n` calls, then succeed.
    pub const fn times(errno: Errno, n: u32) -> Self {
        Self {
            errno: errno.to_errno(),
            times: Some(n),
        }
    }

    /// Consume one call: `Err` while the fault is armed.
    pub(crate) fn fire(&mut self) -> Result<(), Errno> {
        match self.times {
            Some(0) => return Ok(()),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        Err(Errno::from_code(self.errno))
    }
}

impl From<Errno> for Fault {
    fn from(errno: Errno) -> Self {
        Self::always(errno)
    }
}

/// Trigger an optional fault.
pub(crate) fn check(slot: &mut Option<Fault>) -> Result<(), Errno> {
    slot.as_mut().map_or(Ok(()), Fault::fire)
}

/// Per-entry-point faults. Unset entries always succeed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FaultPlan {
    /// Trace capture start.
    pub trace_init: Option<Fault>,
    /// Vendor pre-registration setup.
    pub driver_init: Option<Fault>,
    /// Bus driver registration.
    pub register: Option<Fault>,
    /// Display-framework bind.
    pub bind: Option<Fault>,
    /// Global services init.
    pub global_init: Option<Fault>,
    /// Global services teardown.
    pub global_deinit: Option<Fault>,
    /// Device-level init.
    pub device_init: Option<Fault>,
    /// Device-level deinit.
    pub device_deinit: Option<Fault>,
    /// Vendor post-deregistration teardown.
    pub driver_deinit: Option<Fault>,
    /// Session open.
    pub open_session: Option<Fault>,
    /// Session close.
    pub close_session: Option<Fault>,
}
