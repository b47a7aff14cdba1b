//! Logging initialization and configuration.
//!
//! Logs are written to files so they never interleave with the interactive
//! shell that owns the terminal. Files live under the `.logs/` directory of
//! the environments root, roll over daily, and only the newest
//! [`MAX_LOG_FILES`] are kept.
//!
//! # Configuration
//!
//! The log level can be controlled via the `RUST_LOG` environment variable:
//! - `RUST_LOG=debug` - Show debug and higher level logs
//! - `RUST_LOG=info` - Show info and higher level logs (default)
//! - `RUST_LOG=warn` - Show warnings and errors only

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Number of log files retained in the log directory.
pub const MAX_LOG_FILES: usize = 7;

const LOG_PREFIX: &str = "ocenv";
const LOG_SUFFIX: &str = "log";

fn is_log_file(name: &str) -> bool {
    name.starts_with(&format!("{LOG_PREFIX}.")) && name.ends_with(&format!(".{LOG_SUFFIX}"))
}

/// Delete all but the newest `keep` log files in `dir`.
///
/// File names carry a sortable date, so name order is age order. Returns
/// the number of files removed.
pub(crate) fn prune_old_logs(dir: &Path, keep: usize) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    let mut logs: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| entry.file_name().to_str().is_some_and(is_log_file))
        .map(|entry| entry.path())
        .collect();
    if logs.len() <= keep {
        return 0;
    }
    logs.sort();

    let excess = logs.len() - keep;
    logs.iter()
        .take(excess)
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Warning: Failed to remove old log {}: {}", path.display(), e);
                false
            }
        })
        .count()
}

/// Initialize file logging in `log_dir`.
///
/// Lines go to a daily file such as `ocenv.2024-12-06.log`. The returned
/// guard flushes the non-blocking writer when dropped and must be held until
/// exit.
///
/// Failure to set up the log file is reported on stderr and otherwise
/// ignored; the tool works without logs.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Warning: Failed to create log directory {}: {}", log_dir.display(), e);
        return None;
    }

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Failed to create log file: {}", e);
            return None;
        }
    };
    // The appender only prunes when it rolls over mid-run.
    let pruned = prune_old_logs(log_dir, MAX_LOG_FILES);

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Warning: Failed to install logger: {}", e);
        return None;
    }

    tracing::info!("Logging initialized - writing to {}", log_dir.display());
    if pruned > 0 {
        tracing::debug!("Removed {} old log files", pruned);
    }
    Some(guard)
}
