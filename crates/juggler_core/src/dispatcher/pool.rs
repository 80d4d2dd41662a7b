//! Shared-memory worker pool

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use crate::axis::Axis;
use crate::error::{Result, SweepError};
use crate::space::CombinationSpace;

use super::{Outcomes, RunUnit, apply};

/// Everything a worker thread needs, borrowed from the dispatcher
pub(crate) struct Workload<'a, F> {
    pub(crate) axes: &'a [Axis],
    pub(crate) space: &'a CombinationSpace,
    pub(crate) outcomes: &'a Outcomes,
    pub(crate) callback: &'a F,
}

impl<F: RunUnit> Workload<'_, F> {
    /// Claim, rewrite and run until the space is empty or the stop flag is set.
    fn work(&self, slot: usize) -> Result<()> {
        while !self.outcomes.stopped() {
            let Some(unit) = self.space.claim() else {
                break;
            };
            tracing::debug!(slot, unit = %unit, "claimed unit");
            apply(self.axes, &unit, slot)?;
            let status = self.callback.run(slot, &unit);
            self.outcomes.record(slot, &unit, status);
        }
        Ok(())
    }

    /// [`work`](Self::work) with panics turned into errors. Any error stops
    /// the other workers from claiming further units.
    fn work_guarded(&self, slot: usize) -> Result<()> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.work(slot)))
            .unwrap_or(Err(SweepError::WorkerPanicked { slot }));
        if let Err(e) = &result {
            tracing::error!(slot, error = %e, "worker failed");
            self.outcomes.stop.trip();
        }
        result
    }
}

fn first_error(errors: Mutex<Vec<SweepError>>) -> Result<()> {
    let mut errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.swap_remove(0))
    }
}

/// Run `workers` slots concurrently on a dedicated thread pool.
#[cfg(feature = "parallel")]
pub(crate) fn run_pool<F: RunUnit>(workload: &Workload<'_, F>, workers: usize) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("juggler-slot-{i}"))
        .build()?;

    let errors = Mutex::new(Vec::new());
    pool.scope(|scope| {
        for slot in 0..workers {
            let errors = &errors;
            scope.spawn(move |_| {
                if let Err(e) = workload.work_guarded(slot) {
                    errors
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(e);
                }
            });
        }
    });
    first_error(errors)
}

/// Run `workers` slots concurrently on scoped OS threads.
#[cfg(not(feature = "parallel"))]
pub(crate) fn run_pool<F: RunUnit>(workload: &Workload<'_, F>, workers: usize) -> Result<()> {
    let errors = Mutex::new(Vec::new());
    std::thread::scope(|scope| {
        for slot in 0..workers {
            let errors = &errors;
            scope.spawn(move || {
                if let Err(e) = workload.work_guarded(slot) {
                    errors
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(e);
                }
            });
        }
    });
    first_error(errors)
}
