//! ocenv - ephemeral per-cluster shell environments
//!
//! This library provides the core of the `ocenv` tool:
//! - Workspace store: one directory per environment alias
//! - Credential materialization: kubeconfig, OCM config and shell variables
//! - Helper scripts for login, metrics browsing, describe and prompt
//! - Shell supervision with terminal handoff and descendant cleanup
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use ocenv::{Environment, Options};
//!
//! fn main() -> ocenv::Result<()> {
//!     let env = Environment::new(
//!         Path::new("/home/user/ocenv"),
//!         Options {
//!             cluster_id: Some("1a2b3c".to_string()),
//!             ..Options::default()
//!         },
//!     )?;
//!
//!     // Blocks until the user leaves the shell
//!     let status = env.run("/bin/zsh", std::io::stdout())?;
//!     println!("shell exited with {status}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod shell;
pub mod utils;
pub mod workspace;

// Re-export commonly used types
pub use config::Settings;
pub use env::{Credentials, Environment, KubeconfigSource, Options};
pub use error::{EnvError, Result};
pub use shell::Supervisor;
pub use workspace::Workspace;
