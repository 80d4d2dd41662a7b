use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Size above which the previous run's log is moved aside on startup (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Crates whose events pass the default filter
const LOG_TARGETS: [&str; 2] = [env!("CARGO_CRATE_NAME"), "juggler_core"];

/// Path the previous log is moved to: `sweep.log` becomes `sweep.log.1`.
fn backup_path(log_path: &Path) -> PathBuf {
    let mut name = OsString::from(log_path.as_os_str());
    name.push(".1");
    PathBuf::from(name)
}

/// Move `log_path` to its backup once it has grown past `max`, replacing
/// any older backup. Returns the backup path when the log was moved.
fn rotate_log(log_path: &Path, max: u64) -> std::io::Result<Option<PathBuf>> {
    let size = match fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if size <= max {
        return Ok(None);
    }

    let backup = backup_path(log_path);
    match fs::remove_file(&backup) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    fs::rename(log_path, &backup)?;
    Ok(Some(backup))
}

/// Filter directives enabling `level` for the sweep crates only.
fn default_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn level_filter(level: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(default_filter(level))
}

/// Initialize logging.
///
/// With a `log_file`, events from every worker thread are appended to it,
/// tagged with the thread name. A log over 5 MB left by an earlier sweep
/// is first moved to `<file>.1`. Without a file, events go to stderr.
/// `RUST_LOG` overrides `level`; an unparsable `level` is an error.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let fallback = level_filter(level)?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(fallback);

    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
        return Ok(());
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let rotated = rotate_log(log_path, MAX_LOG_SIZE);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .init();

    match rotated {
        Ok(Some(backup)) => {
            tracing::info!(path = %log_path.display(), backup = %backup.display(), "logging initialized, previous log moved");
        }
        Ok(None) => tracing::info!(path = %log_path.display(), "logging initialized"),
        Err(e) => tracing::warn!(path = %log_path.display(), error = %e, "failed to rotate log file"),
    }
    Ok(())
}
