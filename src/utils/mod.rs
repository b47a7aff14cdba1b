//! Utility modules for common functionality.
//!
//! This module contains helpers shared across the crate: logging
//! configuration and a drop guard for teardown work.

pub mod guard;
pub mod logger;
