//! Session Gate.
//!
//! Every open client session holds one residency pin on the driver binary.
//! `open` pins first and only then acquires per-session resources; if that
//! fails the pin is dropped again, so a failed open has no net effect.
//! `close` is total: resource release is best-effort and the pin is always
//! dropped.

use crate::services::ServicesAdapter;
use crate::state::LifecycleState;
use pvr_common::device::FileHandle;
use pvr_common::error::LifecycleError;
use pvr_common::services::Residency;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Proof of one open session.
///
/// Not `Clone`: a token is consumed by exactly one [`SessionGate::close`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a session token leaks a residency pin"]
pub struct SessionToken {
    file: FileHandle,
}

impl SessionToken {
    /// File handle the session was opened for.
    pub fn file(&self) -> FileHandle {
        self.file
    }
}

/// Pins driver residency per open session.
pub struct SessionGate {
    residency: Arc<dyn Residency>,
}

impl SessionGate {
    /// Gate sessions on `residency`.
    pub fn new(residency: Arc<dyn Residency>) -> Self {
        Self { residency }
    }

    /// Open a session for `file`.
    ///
    /// # Errors
    /// - `ResidencyUnavailable` if the binary is being unloaded
    /// - `SessionOpenFailed` if the services layer refused the session; the
    ///   residency pin has already been released
    pub fn open(
        &self,
        state: &mut LifecycleState,
        services: &mut ServicesAdapter,
        file: FileHandle,
    ) -> Result<SessionToken, LifecycleError> {
        if !self.residency.try_pin() {
            error!("session open for {}: failed to get module", file);
            return Err(LifecycleError::ResidencyUnavailable);
        }

        if let Err(e) = services.open_session(file) {
            self.residency.unpin();
            warn!("session open for {} failed: {}", file, e);
            return Err(LifecycleError::SessionOpenFailed(e));
        }

        state.session_count += 1;
        debug!("session opened for {} ({} open)", file, state.session_count);
        Ok(SessionToken { file })
    }

    /// Close the session behind `token`. Never fails.
    pub fn close(
        &self,
        state: &mut LifecycleState,
        services: &mut ServicesAdapter,
        token: SessionToken,
    ) {
        // Failure already logged by the adapter; the pin must go regardless.
        let _ = services.close_session(token.file);
        self.residency.unpin();

        debug_assert!(state.session_count > 0, "close without open session");
        state.session_count = state.session_count.saturating_sub(1);
        debug!(
            "session closed for {} ({} open)",
            token.file, state.session_count
        );
    }
}
