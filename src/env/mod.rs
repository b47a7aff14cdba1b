//! Environment lifecycle: build, set up, run and delete one workspace.
//!
//! An [`Environment`] is built from [`Options`] resolved by the caller. The
//! credential fields are folded into a [`Credentials`] mode up front, so the
//! rest of the lifecycle never has to re-validate them.

mod credentials;
mod materialize;
mod scripts;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use chrono::Local;
use tracing::info;

use crate::error::{EnvError, Result};
use crate::shell::Supervisor;
use crate::utils::guard::ExitGuard;
use crate::workspace::Workspace;

pub use credentials::{Credentials, KubeconfigSource};

/// Raw options as resolved from flags and remote lookups.
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub alias: Option<String>,
    pub cluster_id: Option<String>,
    pub external_id: Option<String>,
    pub base_domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    /// Path to a kubeconfig supplied by the user.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig bytes fetched for the cluster; preferred over `kubeconfig`.
    pub kubeconfig_bytes: Option<Vec<u8>>,
    /// OCM config to seed the workspace with; nothing is copied when unset.
    pub ocm_config: Option<PathBuf>,
    pub reset: bool,
    /// Delete the workspace when the session ends.
    pub temp: bool,
}

/// One cluster environment and its workspace.
#[derive(Clone, Debug)]
pub struct Environment {
    alias: String,
    workspace: Workspace,
    credentials: Credentials,
    external_id: Option<String>,
    base_domain: Option<String>,
    ocm_config: Option<PathBuf>,
    reset_requested: bool,
    temporary: bool,
}

fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() || alias == ".." || alias.starts_with('.') || alias.contains('/') {
        return Err(EnvError::ContractViolation(format!(
            "invalid environment alias '{alias}'"
        )));
    }
    Ok(())
}

impl Environment {
    /// Build an environment rooted at `<envs_root>/<alias>`.
    ///
    /// The alias falls back to the cluster id, and temporary environments
    /// without either get a generated `tmp-<timestamp>` alias.
    pub fn new(envs_root: &Path, opts: Options) -> Result<Self> {
        let credentials = Credentials::from_options(&opts)?;

        let alias = match opts.alias.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(alias) => alias.to_string(),
            None => match credentials.cluster_id() {
                Some(cluster_id) => cluster_id.to_string(),
                None if opts.temp => format!("tmp-{}", Local::now().format("%Y%m%d-%H%M%S")),
                None => {
                    return Err(EnvError::ContractViolation(
                        "an alias or cluster id is required".to_string(),
                    ));
                }
            },
        };
        validate_alias(&alias)?;

        Ok(Self {
            workspace: Workspace::new(envs_root.join(&alias)),
            alias,
            credentials,
            external_id: opts.external_id.filter(|v| !v.is_empty()),
            base_domain: opts.base_domain.filter(|v| !v.is_empty()),
            ocm_config: opts.ocm_config,
            reset_requested: opts.reset,
            temporary: opts.temp,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn path(&self) -> &Path {
        self.workspace.root()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Create or refresh the workspace.
    ///
    /// Only a requested reset wipes existing state; otherwise variable and
    /// init files are left as they are, while scripts and the kubeconfig are
    /// rewritten from their sources.
    pub fn setup(&self) -> Result<()> {
        if self.reset_requested && self.workspace.exists() {
            info!("Resetting environment {}", self.alias);
            self.workspace.delete();
        }

        self.workspace.create()?;
        self.create_kubeconfig()?;
        if let Some(source) = &self.ocm_config {
            self.copy_ocm_config(source);
        }
        self.ensure_env_variables()?;
        self.create_bins()?;

        info!(
            "Environment {} ready at {}",
            self.alias,
            self.workspace.root().display()
        );
        Ok(())
    }

    /// Remove the workspace from disk. Failures are logged, never returned.
    pub fn delete(&self) {
        self.workspace.delete();
    }

    /// Set up the workspace and block in an interactive shell until it exits.
    ///
    /// Temporary environments are deleted afterwards, even if the session
    /// fails to launch.
    pub fn run<W: Write>(&self, shell: &str, out: W) -> Result<ExitStatus> {
        self.setup()?;
        let _cleanup = self.temporary.then(|| ExitGuard::with(|| self.delete()));

        let mut supervisor = Supervisor::new(self.workspace.clone(), &self.alias, shell, out);
        supervisor.start()
    }
}
