//! Interactive shell session for one workspace.

use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crossterm::style::Stylize;
use nix::unistd::Pid;
use tracing::{error, info, warn};

use super::pids::{kill_children, kill_group};
use super::terminal::{Terminal, claim_foreground};
use crate::error::{EnvError, Result};
use crate::workspace::{Workspace, vars};

/// Fallback when neither a configured shell nor `$SHELL` is available.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Pick the session shell: configured value, then `$SHELL`, then bash.
pub fn resolve_shell(configured: Option<&str>) -> String {
    configured
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

/// Runs a foreground shell inside a workspace and cleans up after it.
///
/// Banners go to the injected writer rather than process stdout.
pub struct Supervisor<W: Write> {
    workspace: Workspace,
    alias: String,
    shell: String,
    out: W,
    job_control: bool,
}

impl<W: Write> Supervisor<W> {
    pub fn new(workspace: Workspace, alias: &str, shell: &str, out: W) -> Self {
        Self {
            workspace,
            alias: alias.to_string(),
            shell: shell.to_string(),
            out,
            job_control: true,
        }
    }

    /// Toggle terminal foreground handoff. Enabled by default; it is skipped
    /// anyway when stdin is not a terminal.
    pub fn job_control(mut self, enabled: bool) -> Self {
        self.job_control = enabled;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn banner(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "{} {}", "==>".green().bold(), message)
            .and_then(|()| self.out.flush())
        {
            warn!("Failed to write banner: {}", e);
        }
    }

    fn workspace_vars(&self) -> Result<Vec<(String, String)>> {
        let path = self.workspace.vars_path();
        match vars::load(&path)? {
            Some(vars) => Ok(vars),
            None => {
                warn!("{} missing, starting shell without workspace variables", path.display());
                Ok(Vec::new())
            }
        }
    }

    /// Launch the shell and block until it exits.
    ///
    /// On exit, whatever the status, the terminal is reclaimed before the
    /// exit banner is written, then the shell's process group is terminated
    /// and tracked pids are killed.
    pub fn start(&mut self) -> Result<ExitStatus> {
        let root = self.workspace.root().to_path_buf();
        let mut cmd = Command::new(&self.shell);
        cmd.current_dir(&root)
            .envs(self.workspace_vars()?)
            .env("ZDOTDIR", &root)
            .process_group(0);

        let terminal = if self.job_control { Terminal::capture() } else { None };
        if terminal.is_some() {
            // SAFETY: claim_foreground only makes async-signal-safe syscalls.
            unsafe {
                cmd.pre_exec(claim_foreground);
            }
        }

        self.banner(&format!("Switching to OpenShift environment {}", self.alias));

        let mut child = cmd.spawn().map_err(|source| {
            error!("Failed to launch {}: {}", self.shell, source);
            EnvError::ProcessLaunch {
                shell: self.shell.clone(),
                source,
            }
        })?;
        let pgid = Pid::from_raw(child.id() as i32);
        info!("Started {} (pid {}) in {}", self.shell, pgid, root.display());

        if let Some(terminal) = &terminal {
            terminal.hand_to(pgid);
        }

        let mut teardown = Teardown {
            terminal,
            pgid,
            pids_path: self.workspace.pids_path(),
            killed: false,
        };

        let status = child.wait();
        // Writing to the terminal from a background group can stop us with SIGTTOU.
        teardown.reclaim_terminal();
        self.banner(&format!("Exited OpenShift environment {}", self.alias));
        teardown.kill();

        let status = status.map_err(|source| EnvError::ProcessLaunch {
            shell: self.shell.clone(),
            source,
        })?;
        info!("Shell for {} exited with {}", self.alias, status);
        Ok(status)
    }
}

/// Cleanup after the session shell exits.
///
/// The steps are separate so the terminal can be reclaimed before the exit
/// banner and the kill routine run. Dropping an unfinished teardown, as on
/// unwind, runs whatever is left.
struct Teardown {
    terminal: Option<Terminal>,
    pgid: Pid,
    pids_path: PathBuf,
    killed: bool,
}

impl Teardown {
    fn reclaim_terminal(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            terminal.reclaim();
        }
    }

    fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;
        kill_group(self.pgid);
        kill_children(&self.pids_path);
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.reclaim_terminal();
        self.kill();
    }
}
