//! Parameter sweep engine
//!
//! This crate runs an external operation once for every point of a
//! parameter space defined by rewriting text templates. It supports:
//! - Axes binding one or more regex substitution sites of a template to a
//!   sequence of values (explicit lists, additive or custom ranges)
//! - The full Cartesian product of all axes, repeated and optionally
//!   shuffled with a reproducible seed
//! - Worker-private copies of every template, so concurrent units never
//!   share a file
//! - A shared-memory thread pool and a coordinator/worker message-passing
//!   protocol, both stopping at the first failing unit
//!
//! # Example
//!
//! ```ignore
//! use juggler_core::{Axis, Combination, Dispatcher, RunOptions};
//!
//! let mut dispatcher = Dispatcher::new();
//! let mut rate = Axis::new("model.cfg", r"rate=(\S+);")?;
//! rate.set_values([0.1, 0.2, 0.4])?;
//! dispatcher.register(rate);
//!
//! let report = dispatcher.run(
//!     &|slot: usize, _unit: &Combination| run_model(&format!("model_{slot}.cfg")),
//!     &RunOptions { workers: 4, skip_prompt: true, ..Default::default() },
//! )?;
//! assert!(report.is_success());
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod axis;
pub mod dispatcher;
pub mod distributed;
pub mod error;
pub mod files;
pub mod pattern;
pub mod site;
pub mod space;
pub mod value;

// ============================================================================
// Run state modules
// ============================================================================

pub mod progress;
pub mod report;
pub mod stop;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use axis::Axis;
pub use dispatcher::{Confirm, Dispatcher, Proceed, RunOptions, RunUnit};
pub use distributed::{COORDINATOR, Communicator, Envelope, LocalEndpoint, Message, local_world};
pub use error::{ConfigError, Result, SweepError, TransportError};
pub use progress::RunProgress;
pub use report::{RunReport, RunStatus, UnitFailure};
pub use site::{Site, SiteFlags};
pub use space::CombinationSpace;
pub use stop::StopFlag;
pub use value::{Combination, Tuple, Value};
