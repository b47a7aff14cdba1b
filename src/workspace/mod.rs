//! On-disk workspace store.
//!
//! A workspace is the directory tree backing one environment:
//!
//! ```text
//! <root>/
//!   .ocenv            KEY=value lines, one per generated variable
//!   .zshenv           sources .ocenv
//!   kubeconfig.json   mode 0600, only with a kubeconfig source
//!   ocm.json          mode 0600, copy of the user's OCM config
//!   .killpids         newline-separated pids, transient
//!   bin/              mode 0700 helper scripts
//! ```
//!
//! The store owns the tree exclusively. Everything else only asks it for
//! paths.

pub mod vars;

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{EnvError, Result};

pub const VARS_FILE: &str = ".ocenv";
pub const SHELL_INIT_FILE: &str = ".zshenv";
pub const KUBECONFIG_FILE: &str = "kubeconfig.json";
pub const OCM_CONFIG_FILE: &str = "ocm.json";
pub const PIDS_FILE: &str = ".killpids";
pub const BIN_DIR: &str = "bin";

/// Handle to one workspace directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_path(&self) -> PathBuf {
        self.root.join(BIN_DIR)
    }

    pub fn vars_path(&self) -> PathBuf {
        self.root.join(VARS_FILE)
    }

    pub fn shell_init_path(&self) -> PathBuf {
        self.root.join(SHELL_INIT_FILE)
    }

    pub fn kubeconfig_path(&self) -> PathBuf {
        self.root.join(KUBECONFIG_FILE)
    }

    pub fn ocm_config_path(&self) -> PathBuf {
        self.root.join(OCM_CONFIG_FILE)
    }

    pub fn pids_path(&self) -> PathBuf {
        self.root.join(PIDS_FILE)
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the workspace root and its `bin/` directory.
    pub fn create(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        ensure_dir(&self.bin_path())
    }

    /// Recursively remove the workspace.
    ///
    /// A missing directory counts as success. Any other failure is logged
    /// and swallowed: the user is already leaving the environment.
    pub fn delete(&self) {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => info!("Deleted workspace {}", self.root.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Workspace {} already absent", self.root.display());
            }
            Err(e) => warn!("Failed to delete workspace {}: {}", self.root.display(), e),
        }
    }
}

/// Create `path` and any missing parents. Existing directories are left alone.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| EnvError::setup(path, e))
}

/// Create `path` if it does not exist yet.
///
/// Returns a handle open for appending when the file was created here, and
/// `None` when it already existed, in which case nothing is written.
pub fn ensure_file(path: &Path) -> Result<Option<File>> {
    match OpenOptions::new().append(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!("{} already initialized", path.display());
            Ok(None)
        }
        Err(e) => Err(EnvError::setup(path, e)),
    }
}

/// List workspace aliases under `envs_root`, sorted.
///
/// Dot-directories (such as the log directory) are not workspaces.
pub fn list(envs_root: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(envs_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EnvError::setup(envs_root, e)),
    };

    let mut aliases = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EnvError::setup(envs_root, e))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().to_string();
        if is_dir && !name.starts_with('.') {
            aliases.push(name);
        }
    }
    aliases.sort();
    Ok(aliases)
}
