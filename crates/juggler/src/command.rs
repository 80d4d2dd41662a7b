//! Running the plan's command for each unit

use std::path::PathBuf;
use std::process::{Command, Stdio};

use juggler_core::files::private_path;
use juggler_core::{Combination, RunUnit};

/// Status reported when the command could not be started
pub const SPAWN_FAILED: i32 = 127;
/// Status reported when the command was ended by a signal
pub const KILLED: i32 = -1;

/// Runs one external command per unit.
///
/// Arguments may contain `{slot}`, `{config}` (the slot's private copy of
/// the first axis template) and `{values}` (the unit's values, comma
/// separated).
#[derive(Debug, Clone)]
pub struct CommandRunner {
    argv: Vec<String>,
    config_template: Option<PathBuf>,
    workdir: PathBuf,
    quiet: bool,
}

impl CommandRunner {
    pub fn new(argv: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            config_template: None,
            workdir: workdir.into(),
            quiet: false,
        }
    }

    /// Template whose private copy `{config}` expands to
    #[must_use]
    pub fn with_config_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.config_template = Some(template.into());
        self
    }

    /// Discard the command's stdout
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Command line for `slot` running `combination`, placeholders expanded
    #[must_use]
    pub fn expand(&self, slot: usize, combination: &Combination) -> Vec<String> {
        let config = self
            .config_template
            .as_ref()
            .map(|t| private_path(t, slot).display().to_string())
            .unwrap_or_default();
        let slot = slot.to_string();
        let values = combination.to_string();

        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{slot}", &slot)
                    .replace("{config}", &config)
                    .replace("{values}", &values)
            })
            .collect()
    }
}

impl RunUnit for CommandRunner {
    fn run(&self, slot: usize, combination: &Combination) -> i32 {
        let argv = self.expand(slot, combination);
        let Some((program, args)) = argv.split_first() else {
            return SPAWN_FAILED;
        };

        let mut command = Command::new(program);
        command.args(args).current_dir(&self.workdir);
        if self.quiet {
            command.stdout(Stdio::null());
        }

        match command.status() {
            Ok(status) => status.code().unwrap_or(KILLED),
            Err(e) => {
                tracing::error!(slot, program = %program, error = %e, "failed to start command");
                SPAWN_FAILED
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juggler_core::Value;

    fn unit() -> Combination {
        Combination::new(vec![vec![Value::Int(1)], vec![Value::Float(-0.5), Value::Int(60)]])
    }

    #[test]
    fn test_expand_placeholders() {
        let runner = CommandRunner::new(
            vec![
                "model".into(),
                "--config={config}".into(),
                "--id".into(),
                "run{slot}".into(),
                "{values}".into(),
            ],
            "/work",
        )
        .with_config_template("/work/model.cfg");

        assert_eq!(
            runner.expand(3, &unit()),
            vec![
                "model",
                "--config=/work/model_3.cfg",
                "--id",
                "run3",
                "1,-0.5,60"
            ]
        );
    }

    #[test]
    fn test_config_empty_without_template() {
        let runner = CommandRunner::new(vec!["echo".into(), "{config}".into()], ".");
        assert_eq!(runner.expand(0, &unit()), vec!["echo", ""]);
    }

    #[test]
    fn test_missing_program_reports_spawn_failure() {
        let runner = CommandRunner::new(vec!["/nonexistent/juggler-test-binary".into()], ".");
        assert_eq!(runner.run(0, &unit()), SPAWN_FAILED);
    }

    #[test]
    fn test_empty_command_reports_spawn_failure() {
        let runner = CommandRunner::new(Vec::new(), ".");
        assert_eq!(runner.run(0, &unit()), SPAWN_FAILED);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_unit_status() {
        let runner = CommandRunner::new(
            vec!["sh".into(), "-c".into(), "exit {slot}".into()],
            std::env::temp_dir(),
        )
        .quiet(true);
        assert_eq!(runner.run(0, &unit()), 0);
        assert_eq!(runner.run(5, &unit()), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_reports_killed() {
        let runner = CommandRunner::new(
            vec!["sh".into(), "-c".into(), "kill -9 $$".into()],
            std::env::temp_dir(),
        );
        assert_eq!(runner.run(0, &unit()), KILLED);
    }
}
