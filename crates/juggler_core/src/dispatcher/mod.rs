//! The sweep dispatcher: owns the axes, builds the combination space and
//! drives workers through it.
//!
//! Two execution modes share the same axes and report type:
//! - [`Dispatcher::run`]: a pool of threads in this process claiming units
//!   from one locked space
//! - [`Dispatcher::run_distributed`]: a coordinator rank handing units to
//!   worker ranks over a [`Communicator`](crate::distributed::Communicator)
//!
//! # Example
//!
//! ```ignore
//! use juggler_core::{Axis, Dispatcher, RunOptions};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(rate_axis).register(shape_axis);
//!
//! let report = dispatcher.run(
//!     &|slot: usize, unit: &Combination| launch_model(slot, unit),
//!     &RunOptions { workers: 8, skip_prompt: true, ..Default::default() },
//! )?;
//! ```

mod pool;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::axis::Axis;
use crate::error::{ConfigError, Result};
use crate::files::PrivateFiles;
use crate::progress::RunProgress;
use crate::report::{RunReport, UnitFailure};
use crate::space::{CombinationSpace, space_size};
use crate::stop::StopFlag;
use crate::value::Combination;

/// The external run operation invoked once per unit.
///
/// Returns a process-style status: `0` for success, anything else trips the
/// run's stop flag.
pub trait RunUnit: Sync {
    fn run(&self, slot: usize, combination: &Combination) -> i32;
}

impl<F> RunUnit for F
where
    F: Fn(usize, &Combination) -> i32 + Sync,
{
    fn run(&self, slot: usize, combination: &Combination) -> i32 {
        self(slot, combination)
    }
}

/// Asked before any work starts, with the unit and worker counts.
/// Returning `false` aborts the run with nothing performed.
pub trait Confirm: Send + Sync {
    fn confirm(&self, units: usize, workers: usize) -> bool;
}

/// Confirmation that always proceeds
#[derive(Debug, Clone, Copy, Default)]
pub struct Proceed;

impl Confirm for Proceed {
    fn confirm(&self, _units: usize, _workers: usize) -> bool {
        true
    }
}

/// Per-run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Threads in shared-memory mode; clamped to `1..=units`
    pub workers: usize,
    /// Copies of the full product to run; at least 1
    pub repeats: usize,
    /// Claim units in uniformly random order
    pub shuffle: bool,
    /// Seed for the shuffle (None = fresh entropy)
    pub seed: Option<u64>,
    /// Skip the confirmation step
    pub skip_prompt: bool,
    /// Distributed mode: keep handing out units after a failure
    pub drain_after_failure: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            repeats: 1,
            shuffle: false,
            seed: None,
            skip_prompt: false,
            drain_after_failure: false,
        }
    }
}

impl RunOptions {
    pub(crate) fn repeats(&self) -> usize {
        self.repeats.max(1)
    }

    pub(crate) fn build_space(&self, axes: &[Axis]) -> CombinationSpace {
        let space = CombinationSpace::build(axes, self.repeats());
        if self.shuffle {
            space.shuffled(self.seed)
        } else {
            space
        }
    }
}

/// Unit results gathered from every worker of one run
pub(crate) struct Outcomes {
    stop: StopFlag,
    progress: RunProgress,
    failures: Mutex<Vec<UnitFailure>>,
}

impl Outcomes {
    pub(crate) fn new(stop: StopFlag, progress: RunProgress) -> Self {
        Self {
            stop,
            progress,
            failures: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stop.is_set()
    }

    pub(crate) fn record(&self, slot: usize, combination: &Combination, status: i32) {
        self.progress.record(status);
        tracing::debug!(slot, status, unit = %combination, "unit finished");
        if status == 0 {
            return;
        }

        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(UnitFailure {
                slot,
                combination: combination.clone(),
                status,
            });
        if self.stop.trip() {
            tracing::warn!(slot, status, unit = %combination, "unit failed, stopping sweep");
        }
    }

    pub(crate) fn into_failures(self) -> Vec<UnitFailure> {
        self.failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point every axis's sites in `slot`'s private files at `combination`.
pub(crate) fn apply(axes: &[Axis], combination: &Combination, slot: usize) -> Result<()> {
    for (axis, tuple) in axes.iter().zip(combination.tuples()) {
        axis.rewrite(tuple, slot)?;
    }
    Ok(())
}

pub(crate) fn log_report(report: &RunReport) {
    if report.is_success() {
        tracing::info!(
            units = report.completed,
            workers = report.workers,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "sweep completed"
        );
    } else {
        tracing::warn!(
            completed = report.completed,
            failed = report.failures.len(),
            skipped = report.skipped(),
            "sweep stopped after unit failure"
        );
    }
}

/// Owns the registered axes and the state of the current run
pub struct Dispatcher {
    pub(crate) axes: Vec<Axis>,
    pub(crate) files: PrivateFiles,
    pub(crate) stop: StopFlag,
    pub(crate) progress: RunProgress,
    pub(crate) confirm: Arc<dyn Confirm>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::from_axes(Vec::new())
    }

    #[must_use]
    pub fn from_axes(axes: Vec<Axis>) -> Self {
        Self {
            axes,
            files: PrivateFiles::new(),
            stop: StopFlag::new(),
            progress: RunProgress::default(),
            confirm: Arc::new(Proceed),
        }
    }

    /// Use `confirm` before each run that does not skip the prompt
    #[must_use]
    pub fn with_confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Arc::new(confirm);
        self
    }

    /// Append an axis; combinations list tuples in registration order
    pub fn register(&mut self, axis: Axis) -> &mut Self {
        self.axes.push(axis);
        self
    }

    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Handle on the run's stop flag
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Handle on the run's progress counters
    #[must_use]
    pub fn progress(&self) -> RunProgress {
        self.progress.clone()
    }

    /// Units a run with `repeats` repeats would execute
    #[must_use]
    pub fn total_units(&self, repeats: usize) -> usize {
        space_size(&self.axes, repeats.max(1))
    }

    /// Check that every axis is ready to run
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::NoAxes);
        }
        if let Some(axis) = self.axes.iter().find(|a| a.is_empty()) {
            return Err(ConfigError::NoValues {
                template: axis.template().to_path_buf(),
            });
        }
        Ok(())
    }

    /// Run every unit on a pool of worker threads.
    ///
    /// The first failing unit sets the stop flag; workers finish the unit in
    /// hand and claim nothing further. Private copies are removed before
    /// returning.
    pub fn run<F: RunUnit>(&mut self, callback: &F, options: &RunOptions) -> Result<RunReport> {
        self.validate()?;
        self.stop.reset();

        let total = self.total_units(options.repeats);
        let mut workers = options.workers.max(1);
        if workers > total {
            tracing::warn!(workers, units = total, "more workers than units, reducing worker count");
            workers = total;
        }
        self.progress.reset(total);

        if !options.skip_prompt && !self.confirm.confirm(total, workers) {
            tracing::info!(units = total, "sweep aborted at confirmation");
            return Ok(RunReport::aborted(total, workers));
        }

        tracing::info!(units = total, workers, shuffle = options.shuffle, "starting sweep");
        let started = Instant::now();
        let space = options.build_space(&self.axes);
        let outcomes = Outcomes::new(self.stop.clone(), self.progress.clone());

        let result = (0..workers)
            .try_for_each(|slot| self.files.materialize(&self.axes, slot))
            .and_then(|()| {
                let workload = pool::Workload {
                    axes: &self.axes,
                    space: &space,
                    outcomes: &outcomes,
                    callback,
                };
                pool::run_pool(&workload, workers)
            });
        let cleanup = self.files.cleanup();
        result?;
        cleanup?;

        let report = RunReport::finished(
            total,
            self.progress.completed(),
            outcomes.into_failures(),
            workers,
            started.elapsed(),
        );
        log_report(&report);
        Ok(report)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
