//! Command-line front end for the juggler parameter sweep engine
//!
//! Loads a YAML sweep plan, registers its axes with a
//! [`juggler_core::Dispatcher`] and runs the plan's command once per unit.

pub mod command;
pub mod logging;
pub mod plan;
pub mod prompt;
pub mod summary;

pub use command::CommandRunner;
pub use logging::init_logging;
pub use plan::SweepPlan;
pub use prompt::StdinConfirm;
pub use summary::summarize;
