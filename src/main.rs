//! Main entry point for the ocenv command.
//!
//! Parses flags, loads settings, initializes logging, and then either lists,
//! deletes, or sets up an environment and runs a shell inside it.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ocenv::config::{self, Settings};
use ocenv::shell::resolve_shell;
use ocenv::utils;
use ocenv::{Environment, Options, workspace};

/// Create and enter an isolated shell environment for a cluster
#[derive(Parser, Debug)]
#[command(name = "ocenv", version, about)]
struct Cli {
    /// Environment alias; defaults to the cluster id
    alias: Option<String>,

    /// Cluster id used for token login
    #[arg(short = 'c', long)]
    cluster_id: Option<String>,

    /// External id of the cluster
    #[arg(long)]
    external_id: Option<String>,

    /// Base DNS domain of the cluster
    #[arg(long)]
    base_domain: Option<String>,

    /// Username for individual cluster login
    #[arg(short, long)]
    username: Option<String>,

    /// Password for individual cluster login
    #[arg(short, long)]
    password: Option<String>,

    /// API server url for individual cluster login
    #[arg(short, long = "api")]
    api: Option<String>,

    /// Kubeconfig to copy into the environment
    #[arg(short, long)]
    kubeconfig: Option<PathBuf>,

    /// Recreate the environment from scratch
    #[arg(short, long)]
    reset: bool,

    /// Delete the environment when the shell exits
    #[arg(short, long)]
    temp: bool,

    /// Delete the environment and exit
    #[arg(short, long)]
    delete: bool,

    /// Print an export statement for the kubeconfig instead of starting a shell
    #[arg(short, long)]
    export_kubeconfig: bool,

    /// List existing environments
    #[arg(short, long)]
    list: bool,

    /// Directory holding the environments
    #[arg(long, env = "OCENV_DIR")]
    root: Option<PathBuf>,

    /// Shell to launch (defaults to $SHELL)
    #[arg(long)]
    shell: Option<String>,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            alias: self.alias.clone(),
            cluster_id: self.cluster_id.clone(),
            external_id: self.external_id.clone(),
            base_domain: self.base_domain.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            url: self.api.clone(),
            kubeconfig: self.kubeconfig.clone(),
            kubeconfig_bytes: None,
            ocm_config: config::user_ocm_config(),
            reset: self.reset,
            temp: self.temp,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = config::default_settings_path();
    let settings = Settings::load(&settings_path)?;
    let envs_root = settings.envs_root(cli.root.clone());

    // Initialize logging before anything else touches the workspace
    let _log_guard = utils::logger::init_logging(&envs_root.join(".logs"));

    let mut stdout = io::stdout();

    if cli.list {
        for alias in workspace::list(&envs_root)? {
            writeln!(stdout, "{alias}")?;
        }
        return Ok(());
    }

    let env = Environment::new(&envs_root, cli.options())?;

    if cli.delete {
        env.delete();
        writeln!(stdout, "Deleted environment {}", env.alias())?;
        return Ok(());
    }

    if cli.export_kubeconfig {
        env.setup()
            .with_context(|| format!("Failed to set up environment {}", env.alias()))?;
        env.print_kubeconfig_export(&mut stdout)?;
        return Ok(());
    }

    let shell = resolve_shell(cli.shell.as_deref().or(settings.shell.as_deref()));
    let status = env
        .run(&shell, stdout)
        .with_context(|| format!("Failed to run environment {}", env.alias()))?;
    info!("Session for {} finished: {}", env.alias(), status);
    Ok(())
}
