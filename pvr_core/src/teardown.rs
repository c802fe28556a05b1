//! Always-run teardown sequences.
//!
//! Teardown cannot be refused by the driver: once unload or remove starts,
//! every step runs. [`Teardown`] executes each step regardless of the
//! previous outcome and collects the results into a [`TeardownReport`]
//! for logging, instead of returning early on the first error.

use pvr_common::error::Errno;
use serde::Serialize;
use tracing::{debug, warn};

/// Result of a single best-effort step.
pub type StepOutcome = Result<(), Errno>;

/// Recorded status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepStatus {
    /// Step completed.
    Ok,
    /// Step ran and reported an error, which was discarded.
    Failed {
        /// Host error code reported by the step.
        errno: i32,
    },
    /// Step had nothing to do (e.g. subsystem never started).
    Skipped,
}

/// One step in a [`TeardownReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Step name.
    pub step: &'static str,
    /// What happened.
    pub status: StepStatus,
}

/// Builder that runs steps in order, never short-circuiting.
#[derive(Debug)]
pub struct Teardown {
    sequence: &'static str,
    steps: Vec<StepReport>,
}

impl Teardown {
    /// Start a named sequence.
    pub fn new(sequence: &'static str) -> Self {
        Self {
            sequence,
            steps: Vec::with_capacity(4),
        }
    }

    /// Run `f` and record its outcome.
    pub fn step(&mut self, step: &'static str, f: impl FnOnce() -> StepOutcome) -> &mut Self {
        let status = match f() {
            Ok(()) => {
                debug!("{}: {} ok", self.sequence, step);
                StepStatus::Ok
            }
            Err(e) => {
                warn!("{}: {} failed ({}), continuing", self.sequence, step, e);
                StepStatus::Failed {
                    errno: e.to_errno(),
                }
            }
        };
        self.steps.push(StepReport { step, status });
        self
    }

    /// Record a step that had nothing to do.
    pub fn skip(&mut self, step: &'static str) -> &mut Self {
        debug!("{}: {} skipped", self.sequence, step);
        self.steps.push(StepReport {
            step,
            status: StepStatus::Skipped,
        });
        self
    }

    /// Finish the sequence.
    pub fn finish(self) -> TeardownReport {
        TeardownReport {
            sequence: self.sequence,
            steps: self.steps,
        }
    }
}

/// Outcome of every step of a teardown sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// Sequence name.
    pub sequence: &'static str,
    /// Steps in execution order.
    pub steps: Vec<StepReport>,
}

impl TeardownReport {
    /// Number of steps recorded (run or skipped).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no step was recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that reported an error.
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed { .. }))
    }

    /// True if no step failed.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Status of a named step.
    pub fn status_of(&self, step: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| s.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_step_runs_after_failure() {
        let mut ran = Vec::new();
        let mut teardown = Teardown::new("test");
        teardown
            .step("first", || {
                ran.push(1);
                Err(Errno::EIO)
            })
            .step("second", || {
                ran.push(2);
                Ok(())
            })
            .skip("third");
        let report = teardown.finish();

        assert_eq!(ran, vec![1, 2]);
        assert_eq!(report.len(), 3);
        assert!(!report.is_clean());
        assert_eq!(
            report.status_of("first"),
            Some(StepStatus::Failed {
                errno: Errno::EIO.to_errno()
            })
        );
        assert_eq!(report.status_of("second"), Some(StepStatus::Ok));
        assert_eq!(report.status_of("third"), Some(StepStatus::Skipped));
    }

    #[test]
    fn clean_report() {
        let mut teardown = Teardown::new("test");
        teardown.step("only", || Ok(()));
        let report = teardown.finish();
        assert!(report.is_clean());
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn report_serializes() {
        let mut teardown = Teardown::new("unload");
        teardown.step("device_deinit", || Err(Errno::EBUSY));
        let json = serde_json::to_string(&teardown.finish()).unwrap();
        assert!(json.contains("\"step\":\"device_deinit\""));
        assert!(json.contains("\"result\":\"failed\""));
    }
}
