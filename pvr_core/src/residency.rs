//! Module residency reference counting.
//!
//! `ModuleRef` models the host's per-module reference count: sessions pin
//! the binary with [`Residency::try_pin`], and the host may only begin
//! unloading once no pins are held. Once unloading has begun, new pins are
//! refused.

use pvr_common::services::Residency;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

const LIVE: u8 = 0;
const GOING: u8 = 1;
const GONE: u8 = 2;

/// Why the host refused to unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResidencyError {
    /// Sessions still pin the binary.
    #[error("module busy: {refs} references held")]
    Busy {
        /// Outstanding pins.
        refs: usize,
    },
    /// Unload already started or finished.
    #[error("module is not live")]
    NotLive,
}

/// Atomic module reference count.
#[derive(Debug)]
pub struct ModuleRef {
    refs: AtomicUsize,
    state: AtomicU8,
}

impl ModuleRef {
    /// A live module with no references.
    pub const fn new() -> Self {
        Self {
            refs: AtomicUsize::new(0),
            state: AtomicU8::new(LIVE),
        }
    }

    /// Outstanding pins.
    pub fn refcount(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    /// True while new pins are accepted.
    pub fn is_live(&self) -> bool {
        self.state.load(Ordering::SeqCst) == LIVE
    }

    /// Enter the going state.
    ///
    /// # Errors
    /// `Busy` if any pin is held (the module stays live), `NotLive` if
    /// unloading already began.
    pub fn begin_unload(&self) -> Result<(), ResidencyError> {
        self.state
            .compare_exchange(LIVE, GOING, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ResidencyError::NotLive)?;

        // A pinner increments before re-checking state, so one side always
        // observes the other.
        let refs = self.refs.load(Ordering::SeqCst);
        if refs > 0 {
            self.state.store(LIVE, Ordering::SeqCst);
            return Err(ResidencyError::Busy { refs });
        }
        debug!("module going");
        Ok(())
    }

    /// Mark the module unloaded.
    pub fn finish_unload(&self) {
        self.state.store(GONE, Ordering::SeqCst);
    }

    /// Make an unloaded module live again for a fresh load.
    pub fn revive(&self) -> bool {
        self.state
            .compare_exchange(GONE, LIVE, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for ModuleRef {
    fn default() -> Self {
        Self::new()
    }
}

impl Residency for ModuleRef {
    fn try_pin(&self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.refs.fetch_add(1, Ordering::SeqCst);
        if !self.is_live() {
            self.refs.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    fn unpin(&self) {
        let prev = self
            .refs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| r.checked_sub(1));
        if prev.is_err() {
            warn!("module unpin without matching pin");
        }
    }
}
