//! Tests for the coordinator/worker protocol
//!
//! These tests verify:
//! - Every unit runs exactly once across worker ranks
//! - The coordinator never runs the callback
//! - Dispatch halts after a failure unless draining is requested
//! - A worker rank that cannot continue stops the whole sweep
//! - World size is validated against the space

use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use super::{expected_text, three_axis_sweep};
use crate::dispatcher::{Confirm, RunOptions};
use crate::distributed::COORDINATOR;
use crate::error::{ConfigError, SweepError};
use crate::files::private_path;
use crate::report::RunStatus;
use crate::value::Combination;

fn skip_prompt() -> RunOptions {
    RunOptions {
        skip_prompt: true,
        ..Default::default()
    }
}

struct Decline;

impl Confirm for Decline {
    fn confirm(&self, _units: usize, _workers: usize) -> bool {
        false
    }
}

#[test]
fn test_ranks_cover_every_unit_once() {
    let dir = TempDir::new().unwrap();
    let (template, mut dispatcher) = three_axis_sweep(dir.path());

    let seen = Mutex::new(Vec::new());
    let report = dispatcher
        .run_ranks(
            4,
            &|slot: usize, unit: &Combination| {
                assert_ne!(slot, COORDINATOR);
                let text = fs::read_to_string(private_path(&template, slot)).unwrap();
                assert_eq!(text, expected_text(unit));
                seen.lock().unwrap().push(unit.to_string());
                0
            },
            &skip_prompt(),
        )
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.completed, 48);
    assert_eq!(report.workers, 3);

    let mut seen = seen.into_inner().unwrap();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 48);
    for rank in 0..4 {
        assert!(!private_path(&template, rank).exists());
    }
}

#[test]
fn test_failure_halts_dispatch() {
    let dir = TempDir::new().unwrap();
    let (_, mut dispatcher) = three_axis_sweep(dir.path());

    let calls = AtomicUsize::new(0);
    let report = dispatcher
        .run_ranks(
            3,
            &|_: usize, _: &Combination| {
                calls.fetch_add(1, Ordering::SeqCst);
                1
            },
            &skip_prompt(),
        )
        .unwrap();

    // Each worker runs only its seeded unit
    assert_eq!(calls.into_inner(), 2);
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.completed, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.skipped(), 46);
}

#[test]
fn test_drain_after_failure_runs_everything() {
    let dir = TempDir::new().unwrap();
    let (_, mut dispatcher) = three_axis_sweep(dir.path());

    let options = RunOptions {
        drain_after_failure: true,
        ..skip_prompt()
    };
    let report = dispatcher
        .run_ranks(
            3,
            &|_: usize, unit: &Combination| i32::from(unit.to_string().starts_with('1')),
            &options,
        )
        .unwrap();

    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.completed, 48);
    assert_eq!(report.failures.len(), 12);
}

#[test]
fn test_lost_private_file_stops_every_rank() {
    let dir = TempDir::new().unwrap();
    let (template, mut dispatcher) = three_axis_sweep(dir.path());

    let calls = AtomicUsize::new(0);
    let result = dispatcher.run_ranks(
        3,
        &|slot: usize, _: &Combination| {
            calls.fetch_add(1, Ordering::SeqCst);
            if slot == 1 {
                // The next rewrite on this rank has nothing to read
                fs::remove_file(private_path(&template, 1)).unwrap();
            } else {
                thread::sleep(Duration::from_millis(20));
            }
            0
        },
        &skip_prompt(),
    );

    match result {
        Err(SweepError::Io { path, .. }) => assert_eq!(path, private_path(&template, 1)),
        other => panic!("expected an i/o error, got {other:?}"),
    }
    // Rank 1 runs one unit; rank 2 is turned away after the abort
    assert!(calls.into_inner() < 8);
    for rank in 0..3 {
        assert!(!private_path(&template, rank).exists());
    }
}

#[test]
fn test_panicking_rank_stops_sweep() {
    let dir = TempDir::new().unwrap();
    let (template, mut dispatcher) = three_axis_sweep(dir.path());

    let calls = AtomicUsize::new(0);
    let result = dispatcher.run_ranks(
        3,
        &|slot: usize, _: &Combination| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if slot == 2 && n > 0 {
                panic!("model crashed");
            }
            thread::sleep(Duration::from_millis(5));
            0
        },
        &skip_prompt(),
    );

    assert!(matches!(result, Err(SweepError::WorkerPanicked { slot: 2 })));
    assert!(calls.into_inner() < 48);
    assert!(dispatcher.stop_flag().is_set());
    for rank in 0..3 {
        assert!(!private_path(&template, rank).exists());
    }
}

#[test]
fn test_declined_coordinator_releases_workers() {
    let dir = TempDir::new().unwrap();
    let (_, dispatcher) = three_axis_sweep(dir.path());
    let mut dispatcher = dispatcher.with_confirm(Decline);

    let calls = AtomicUsize::new(0);
    let report = dispatcher
        .run_ranks(
            3,
            &|_: usize, _: &Combination| {
                calls.fetch_add(1, Ordering::SeqCst);
                0
            },
            &RunOptions::default(),
        )
        .unwrap();

    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(calls.into_inner(), 0);
}

#[test]
fn test_more_worker_ranks_than_units() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("tiny.cfg");
    fs::write(&template, "k=0\n").unwrap();

    let mut axis = crate::axis::Axis::new(&template, r"k=(\d+)").unwrap();
    axis.set_values([1, 2, 3]).unwrap();
    let mut dispatcher = crate::dispatcher::Dispatcher::new();
    dispatcher.register(axis);

    let result = dispatcher.run_ranks(5, &|_: usize, _: &Combination| 0, &skip_prompt());
    assert!(matches!(
        result,
        Err(SweepError::Config(ConfigError::TooManyRanks {
            workers: 4,
            units: 3
        }))
    ));
}

#[test]
fn test_world_needs_a_worker() {
    let dir = TempDir::new().unwrap();
    let (_, mut dispatcher) = three_axis_sweep(dir.path());

    let result = dispatcher.run_ranks(1, &|_: usize, _: &Combination| 0, &skip_prompt());
    assert!(matches!(
        result,
        Err(SweepError::Config(ConfigError::WorldTooSmall { size: 1 }))
    ));
}
