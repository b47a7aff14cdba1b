//! Error types for environment setup and session launch.
//!
//! Cleanup failures are deliberately absent here: teardown problems are
//! logged with `tracing::warn!` at the point they happen and never returned.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for environment operations.
pub type Result<T> = std::result::Result<T, EnvError>;

/// Errors that can abort an environment command.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A workspace directory or file could not be created or written.
    #[error("failed to set up {}: {source}", .path.display())]
    Setup {
        /// The path being created or written.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Options were combined in a way that cannot produce a usable login.
    #[error("invalid environment options: {0}")]
    ContractViolation(String),

    /// The interactive shell could not be started.
    #[error("failed to launch shell '{shell}': {source} (set $SHELL or pass --shell)")]
    ProcessLaunch {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    /// The settings file exists but could not be read or parsed.
    #[error("invalid config at {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl EnvError {
    pub(crate) fn setup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Setup {
            path: path.into(),
            source,
        }
    }
}
