//! Run outcome types

use std::fmt;
use std::time::Duration;

use crate::value::Combination;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every unit ran and every callback succeeded
    Completed,
    /// At least one callback failed and the stop flag was set
    Stopped,
    /// The confirmation prompt was declined; nothing ran
    Aborted,
}

/// A unit whose callback returned a non-zero status
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub slot: usize,
    pub combination: Combination,
    pub status: i32,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot {} exited with status {} for ({})",
            self.slot, self.status, self.combination
        )
    }
}

/// Summary of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    /// Units in the combination space
    pub total_units: usize,
    /// Units whose callback ran (successfully or not)
    pub completed: usize,
    /// Every failed unit, in the order failures were observed
    pub failures: Vec<UnitFailure>,
    /// Workers (or worker ranks) used
    pub workers: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn aborted(total_units: usize, workers: usize) -> Self {
        Self {
            status: RunStatus::Aborted,
            total_units,
            completed: 0,
            failures: Vec::new(),
            workers,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn finished(
        total_units: usize,
        completed: usize,
        failures: Vec<UnitFailure>,
        workers: usize,
        elapsed: Duration,
    ) -> Self {
        let status = if failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Stopped
        };
        Self {
            status,
            total_units,
            completed,
            failures,
            workers,
            elapsed,
        }
    }

    /// All units ran and succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// First failure observed, if any
    #[must_use]
    pub fn first_failure(&self) -> Option<&UnitFailure> {
        self.failures.first()
    }

    /// Units that never ran
    #[must_use]
    pub fn skipped(&self) -> usize {
        match self.status {
            RunStatus::Aborted => self.total_units,
            _ => self.total_units.saturating_sub(self.completed),
        }
    }
}
