//! Interactive confirmation before a sweep starts

use std::io::{self, BufRead, Write};

use juggler_core::Confirm;

/// What the user asked for at the prompt
#[derive(Debug, Clone, PartialEq)]
enum Answer {
    Proceed,
    Estimate(f64),
    Invalid(String),
    Abort,
}

fn parse_answer(line: &str) -> Answer {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Answer::Proceed;
    }
    match line.strip_prefix("t ") {
        Some(seconds) => match seconds.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Answer::Estimate(seconds),
            _ => Answer::Invalid(seconds.trim().to_string()),
        },
        None => Answer::Abort,
    }
}

/// Round to six significant digits and drop trailing zeros
fn significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Wall-clock estimate for `units` units of `seconds` each spread over
/// `workers`, in the largest unit that keeps the number readable.
#[must_use]
pub fn format_estimate(units: usize, workers: usize, seconds: f64) -> String {
    let total = units as f64 * seconds / workers.max(1) as f64;
    let (value, unit) = if total > 3600.0 {
        (total / 3600.0, "hours")
    } else if total > 60.0 {
        (total / 60.0, "minutes")
    } else {
        (total, "seconds")
    };
    format!("Expected time: {} {unit}", significant(value))
}

/// Ask on `output` and read answers from `input` until the user proceeds or
/// aborts. End of input aborts.
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    units: usize,
    workers: usize,
) -> io::Result<bool> {
    loop {
        write!(
            output,
            "Press either:\n\tenter to run {units} units on {workers} workers.\n\
             \tt [time per unit in seconds] for a time estimate.\n\tq to end.\n"
        )?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }

        match parse_answer(&line) {
            Answer::Proceed => return Ok(true),
            Answer::Estimate(seconds) => {
                writeln!(output, "{}", format_estimate(units, workers, seconds))?;
            }
            Answer::Invalid(text) => {
                writeln!(output, "Not a duration in seconds: {text}")?;
            }
            Answer::Abort => {
                writeln!(output, "exiting..")?;
                return Ok(false);
            }
        }
    }
}

/// Confirmation read from the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, units: usize, workers: usize) -> bool {
        let stdin = io::stdin();
        let stdout = io::stdout();
        match ask(&mut stdin.lock(), &mut stdout.lock(), units, workers) {
            Ok(proceed) => proceed,
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt failed, aborting");
                false
            }
        }
    }
}
