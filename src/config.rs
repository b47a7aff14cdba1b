//! User settings and well-known locations.
//!
//! Settings live in `~/.config/ocenv/config.json`. Every field is optional;
//! command-line flags and environment variables override the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EnvError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one workspace per alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envs_root: Option<PathBuf>,
    /// Shell launched inside workspaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_settings_path() -> PathBuf {
    home_dir().join(".config").join("ocenv").join("config.json")
}

/// `~/ocenv`
pub fn default_envs_root() -> PathBuf {
    home_dir().join("ocenv")
}

/// The user's OCM config: `$OCM_CONFIG`, else `~/.config/ocm/ocm.json`.
pub fn user_ocm_config() -> Option<PathBuf> {
    let path = std::env::var_os("OCM_CONFIG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config").join("ocm").join("ocm.json"));
    path.is_file().then_some(path)
}

impl Settings {
    /// Load settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(EnvError::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };
        serde_json::from_str(&raw).map_err(|e| EnvError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolve the environments root: explicit value, then file, then `~/ocenv`.
    pub fn envs_root(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.envs_root.clone())
            .unwrap_or_else(default_envs_root)
    }
}
