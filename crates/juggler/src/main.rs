use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail};
use juggler::{CommandRunner, StdinConfirm, SweepPlan, init_logging, summarize};
use juggler_core::{RunOptions, RunStatus};

#[derive(Parser, Debug)]
#[command(name = "juggler")]
#[command(about = "Run a command once for every combination of template parameters")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every unit of a sweep plan
    Run(RunArgs),
    /// Validate a sweep plan and print its size
    Check {
        /// Path to the YAML sweep plan
        plan: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the YAML sweep plan
    plan: PathBuf,

    /// Units run concurrently
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Copies of the full parameter product to run
    #[arg(short, long, default_value_t = 1)]
    repeats: usize,

    /// Run units in random order
    #[arg(long)]
    shuffle: bool,

    /// Seed for --shuffle
    #[arg(long, requires = "shuffle")]
    seed: Option<u64>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Run the coordinator/worker protocol with this many ranks (one
    /// coordinator plus ranks - 1 workers) instead of a thread pool
    #[arg(long, conflicts_with = "workers")]
    ranks: Option<usize>,

    /// With --ranks, keep dispatching units after a failure
    #[arg(long, requires = "ranks")]
    drain: bool,

    /// Discard the command's standard output
    #[arg(short, long)]
    quiet: bool,
}

fn plan_dir(plan: &Path) -> PathBuf {
    plan.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn run(args: RunArgs) -> color_eyre::Result<()> {
    let plan = SweepPlan::load(&args.plan)?;
    let base_dir = plan_dir(&args.plan);
    let mut dispatcher = plan.dispatcher(&base_dir)?.with_confirm(StdinConfirm);

    let mut runner = CommandRunner::new(plan.command.argv(), &base_dir).quiet(args.quiet);
    if let Some(first) = dispatcher.axes().first() {
        runner = runner.with_config_template(first.template());
    }

    let options = RunOptions {
        workers: args.workers,
        repeats: args.repeats,
        shuffle: args.shuffle,
        seed: args.seed,
        skip_prompt: args.yes,
        drain_after_failure: args.drain,
    };

    let started = jiff::Timestamp::now();
    let report = match args.ranks {
        Some(ranks) => dispatcher.run_ranks(ranks, &runner, &options),
        None => dispatcher.run(&runner, &options),
    }
    .wrap_err("sweep failed")?;

    print!("{}", summarize(&report, started));
    if report.status == RunStatus::Stopped {
        bail!("{} of {} units failed", report.failures.len(), report.completed);
    }
    Ok(())
}

fn check(plan_path: &Path) -> color_eyre::Result<()> {
    let plan = SweepPlan::load(plan_path)?;
    let dispatcher = plan.dispatcher(&plan_dir(plan_path))?;
    dispatcher.validate()?;

    for (index, axis) in dispatcher.axes().iter().enumerate() {
        println!(
            "axis {index}: {} ({} sites, {} values)",
            axis.template().display(),
            axis.sites().len(),
            axis.len()
        );
    }
    println!("{} units", dispatcher.total_units(1));
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), &cli.log_level)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::Check { plan } => check(&plan),
    }
}
