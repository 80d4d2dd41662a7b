//! Coordinator/worker protocol over point-to-point message passing.
//!
//! Rank [`COORDINATOR`] owns the combination space and never runs the
//! callback. Every other rank is a worker holding at most one unit at a
//! time:
//!
//! 1. the coordinator seeds each worker with one unit, tagged with the
//!    worker's rank
//! 2. a worker rewrites its private files, runs the unit and reports the
//!    status back under the same tag
//! 3. the coordinator answers each report with the next unit, or with the
//!    `Assign(None)` sentinel that ends that worker
//!
//! The protocol ends when no unit is outstanding. Once a unit fails the
//! coordinator answers every further report with the sentinel, unless
//! [`RunOptions::drain_after_failure`] asks it to keep handing out units.
//!
//! A worker that cannot go on (a private file it cannot rewrite, a panicking
//! callback) sends [`Message::Aborted`] and exits. The coordinator then stops
//! dispatching regardless of the drain setting and fails the run once the
//! other workers have finished.
//!
//! The transport itself is abstract ([`Communicator`]); [`local`] provides
//! an in-process one over channels.

pub mod local;

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::axis::Axis;
use crate::dispatcher::{Dispatcher, Outcomes, RunOptions, RunUnit, apply, log_report};
use crate::error::{ConfigError, Result, SweepError, TransportError};
use crate::report::RunReport;
use crate::space::CombinationSpace;
use crate::value::Combination;

pub use local::{LocalEndpoint, local_world};

/// Rank that owns the combination space
pub const COORDINATOR: usize = 0;

/// Protocol payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Coordinator to worker: the next unit, or `None` to finish
    Assign(Option<Combination>),
    /// Worker to coordinator: the unit it ran and the callback status
    Completed {
        status: i32,
        combination: Combination,
    },
    /// Worker to coordinator: the worker hit a fatal error and has exited
    Aborted { detail: String },
}

/// A received message with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: usize,
    pub tag: usize,
    pub message: Message,
}

/// Point-to-point transport between the ranks of one world.
pub trait Communicator {
    /// This endpoint's rank, `0..size`
    fn rank(&self) -> usize;

    /// Number of ranks in the world
    fn size(&self) -> usize;

    fn send(
        &self,
        dest: usize,
        tag: usize,
        message: Message,
    ) -> std::result::Result<(), TransportError>;

    /// Block until a message from any rank arrives
    fn recv_any(&self) -> std::result::Result<Envelope, TransportError>;

    /// Block until a message from `source` with `tag` arrives
    fn recv(&self, source: usize, tag: usize) -> std::result::Result<Message, TransportError>;
}

impl Dispatcher {
    /// Run this rank's part of the distributed protocol.
    ///
    /// Every rank must hold the same axes and options. The coordinator's
    /// report covers the whole run; a worker's report covers the units that
    /// worker ran.
    pub fn run_distributed<C, F>(
        &mut self,
        comm: &C,
        callback: &F,
        options: &RunOptions,
    ) -> Result<RunReport>
    where
        C: Communicator + ?Sized,
        F: RunUnit,
    {
        self.validate()?;
        let size = comm.size();
        if size < 2 {
            return Err(ConfigError::WorldTooSmall { size }.into());
        }

        let total = self.total_units(options.repeats);
        let workers = size - 1;
        if workers > total {
            return Err(ConfigError::TooManyRanks {
                workers,
                units: total,
            }
            .into());
        }

        self.stop.reset();
        self.progress.reset(total);

        if comm.rank() == COORDINATOR {
            self.coordinate(comm, total, workers, options)
        } else {
            self.serve(comm, callback, total, workers)
        }
    }

    fn coordinate<C>(
        &mut self,
        comm: &C,
        total: usize,
        workers: usize,
        options: &RunOptions,
    ) -> Result<RunReport>
    where
        C: Communicator + ?Sized,
    {
        let proceed = options.skip_prompt || self.confirm.confirm(total, workers);
        let space = if proceed {
            tracing::info!(units = total, workers, shuffle = options.shuffle, "coordinating sweep");
            options.build_space(&self.axes)
        } else {
            tracing::info!(units = total, "sweep aborted at confirmation");
            CombinationSpace::from_units(Vec::new())
        };

        let started = Instant::now();
        let outcomes = Outcomes::new(self.stop.clone(), self.progress.clone());
        let mut outstanding = 0usize;

        for rank in 1..comm.size() {
            let unit = space.claim();
            if unit.is_some() {
                outstanding += 1;
            }
            comm.send(rank, rank, Message::Assign(unit))?;
        }

        if !proceed {
            return Ok(RunReport::aborted(total, workers));
        }

        let mut aborted: Option<SweepError> = None;
        while outstanding > 0 {
            let Envelope {
                source,
                tag,
                message,
            } = comm.recv_any()?;
            outstanding -= 1;

            let (status, combination) = match message {
                Message::Completed {
                    status,
                    combination,
                } => (status, combination),
                Message::Aborted { detail } => {
                    tracing::error!(rank = source, detail = %detail, "worker rank aborted, stopping sweep");
                    self.stop.trip();
                    aborted.get_or_insert(SweepError::RankFailed {
                        rank: source,
                        detail,
                    });
                    continue;
                }
                Message::Assign(_) => {
                    return Err(SweepError::Protocol {
                        rank: COORDINATOR,
                        detail: "expected a completion report",
                    });
                }
            };
            outcomes.record(source, &combination, status);

            let halted = aborted.is_some() || (outcomes.stopped() && !options.drain_after_failure);
            let next = if halted { None } else { space.claim() };
            if next.is_some() {
                outstanding += 1;
            }
            comm.send(source, tag, Message::Assign(next))?;
        }

        if let Some(e) = aborted {
            return Err(e);
        }

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

    fn serve<C, F>(
        &mut self,
        comm: &C,
        callback: &F,
        total: usize,
        workers: usize,
    ) -> Result<RunReport>
    where
        C: Communicator + ?Sized,
        F: RunUnit,
    {
        let slot = comm.rank();
        let started = Instant::now();
        let outcomes = Outcomes::new(self.stop.clone(), self.progress.clone());

        let materialized = self.files.materialize(&self.axes, slot).inspect_err(|e| {
            tracing::error!(slot, error = %e, "worker aborting");
            let _ = comm.send(
                COORDINATOR,
                slot,
                Message::Aborted {
                    detail: e.to_string(),
                },
            );
        });
        let result = materialized.and_then(|()| loop {
            match comm.recv(COORDINATOR, slot)? {
                Message::Assign(None) => break Ok(()),
                Message::Assign(Some(unit)) => {
                    tracing::debug!(slot, unit = %unit, "received unit");
                    let status = match run_unit(&self.axes, callback, slot, &unit) {
                        Ok(status) => status,
                        Err(e) => {
                            let detail = e.to_string();
                            tracing::error!(slot, error = %detail, "worker aborting");
                            // The coordinator may already be gone
                            let _ = comm.send(COORDINATOR, slot, Message::Aborted { detail });
                            break Err(e);
                        }
                    };
                    outcomes.record(slot, &unit, status);
                    comm.send(
                        COORDINATOR,
                        slot,
                        Message::Completed {
                            status,
                            combination: unit,
                        },
                    )?;
                }
                Message::Completed { .. } | Message::Aborted { .. } => {
                    break Err(SweepError::Protocol {
                        rank: slot,
                        detail: "worker received a report",
                    });
                }
            }
        });
        let cleanup = self.files.cleanup();
        result?;
        cleanup?;

        Ok(RunReport::finished(
            total,
            self.progress.completed(),
            outcomes.into_failures(),
            workers,
            started.elapsed(),
        ))
    }
}

/// Rewrite the worker's files for `unit` and run it, with a panic in the
/// callback turned into an error.
fn run_unit<F: RunUnit>(
    axes: &[Axis],
    callback: &F,
    slot: usize,
    unit: &Combination,
) -> Result<i32> {
    apply(axes, unit, slot)?;
    panic::catch_unwind(AssertUnwindSafe(|| callback.run(slot, unit)))
        .map_err(|_| SweepError::WorkerPanicked { slot })
}
