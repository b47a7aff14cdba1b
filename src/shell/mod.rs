//! Shell session supervision.
//!
//! This module launches the interactive workspace shell, hands it the
//! terminal, and cleans up its descendants once it exits.

mod pids;
mod supervisor;
mod terminal;

pub use pids::{kill_children, kill_group};
pub use supervisor::{DEFAULT_SHELL, Supervisor, resolve_shell};
