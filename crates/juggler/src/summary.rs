//! Human-readable run summaries

use std::fmt::Write;

use jiff::{SignedDuration, Timestamp};
use juggler_core::{RunReport, RunStatus};

/// Failures listed individually before the rest are counted
const MAX_LISTED_FAILURES: usize = 10;

fn elapsed(report: &RunReport) -> String {
    match SignedDuration::try_from(report.elapsed) {
        Ok(d) => format!("{:#}", d.round(jiff::Unit::Millisecond).unwrap_or(d)),
        Err(_) => format!("{:?}", report.elapsed),
    }
}

/// Summary printed after a run that started at `started`
#[must_use]
pub fn summarize(report: &RunReport, started: Timestamp) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sweep started {started}");

    match report.status {
        RunStatus::Aborted => {
            let _ = writeln!(out, "Aborted before running any of {} units", report.total_units);
            return out;
        }
        RunStatus::Completed => {
            let _ = writeln!(
                out,
                "Completed {} units on {} workers in {}",
                report.completed,
                report.workers,
                elapsed(report)
            );
        }
        RunStatus::Stopped => {
            let _ = writeln!(
                out,
                "Stopped after {} of {} units ({} failed, {} skipped) in {}",
                report.completed,
                report.total_units,
                report.failures.len(),
                report.skipped(),
                elapsed(report)
            );
            for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
                let _ = writeln!(out, "  {failure}");
            }
            if report.failures.len() > MAX_LISTED_FAILURES {
                let _ = writeln!(
                    out,
                    "  ... and {} more",
                    report.failures.len() - MAX_LISTED_FAILURES
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use juggler_core::{Combination, UnitFailure, Value};

    fn report(status: RunStatus, failures: usize) -> RunReport {
        RunReport {
            status,
            total_units: 48,
            completed: if status == RunStatus::Aborted { 0 } else { 20 },
            failures: (0..failures)
                .map(|i| UnitFailure {
                    slot: i % 4,
                    combination: Combination::new(vec![vec![Value::Int(i as i64)]]),
                    status: 2,
                })
                .collect(),
            workers: 4,
            elapsed: Duration::from_millis(1500),
        }
    }

    fn started() -> Timestamp {
        "2026-10-19T08:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_aborted_summary() {
        let text = summarize(&report(RunStatus::Aborted, 0), started());
        assert!(text.starts_with("Sweep started 2026-10-19T08:00:00Z\n"));
        assert!(text.contains("Aborted before running any of 48 units"));
    }

    #[test]
    fn test_completed_summary() {
        let text = summarize(&report(RunStatus::Completed, 0), started());
        assert!(text.contains("Completed 20 units on 4 workers in 1s 500ms"));
    }

    #[test]
    fn test_stopped_summary_truncates_failures() {
        let text = summarize(&report(RunStatus::Stopped, 12), started());
        assert!(text.contains("Stopped after 20 of 48 units (12 failed, 28 skipped)"));
        assert!(text.contains("  slot 1 exited with status 2 for (1)\n"));
        assert!(text.contains("  ... and 2 more\n"));
        assert_eq!(text.matches("exited with status").count(), MAX_LISTED_FAILURES);
    }
}
