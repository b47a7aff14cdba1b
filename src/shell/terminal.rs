//! Controlling-terminal handoff between the supervisor and the session shell.
//!
//! The shell runs in its own process group. While it is alive that group owns
//! the terminal foreground; once it exits the supervisor takes the foreground
//! back and restores the terminal attributes it saved before launch.

use std::io::{self, IsTerminal};
use std::os::fd::BorrowedFd;

use nix::sys::signal::{SigHandler, Signal, signal};
use nix::sys::termios::{SetArg, Termios, tcgetattr, tcsetattr};
use nix::unistd::{Pid, getpgrp, setpgid, tcsetpgrp};
use tracing::{debug, warn};

/// Run `f` with SIGTTOU ignored so a background group may call `tcsetpgrp`.
fn with_sigttou_ignored<T>(f: impl FnOnce() -> nix::Result<T>) -> nix::Result<T> {
    // SAFETY: installs SIG_IGN and then restores the previous disposition;
    // no handler code is registered.
    let previous = unsafe { signal(Signal::SIGTTOU, SigHandler::SigIgn) }?;
    let result = f();
    // SAFETY: as above, restores the saved disposition.
    unsafe { signal(Signal::SIGTTOU, previous) }?;
    result
}

/// Child-side half of the handoff, run between fork and exec.
///
/// Puts the child in its own process group and makes that group the
/// terminal foreground. Only async-signal-safe calls are made here.
pub(crate) fn claim_foreground() -> io::Result<()> {
    setpgid(Pid::from_raw(0), Pid::from_raw(0))?;
    let pgrp = getpgrp();
    // SAFETY: fd 0 stays open for the duration of this call.
    let stdin = unsafe { BorrowedFd::borrow_raw(0) };
    // SAFETY: SIG_IGN then SIG_DFL; the exec'd shell must not inherit SIG_IGN.
    unsafe { signal(Signal::SIGTTOU, SigHandler::SigIgn) }?;
    tcsetpgrp(stdin, pgrp)?;
    unsafe { signal(Signal::SIGTTOU, SigHandler::SigDfl) }?;
    Ok(())
}

/// Terminal state captured before the shell starts.
pub(crate) struct Terminal {
    saved: Termios,
    owner: Pid,
}

impl Terminal {
    /// Snapshot the controlling terminal, or `None` when stdin is not a TTY.
    pub(crate) fn capture() -> Option<Self> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return None;
        }
        match tcgetattr(&stdin) {
            Ok(saved) => Some(Self {
                saved,
                owner: getpgrp(),
            }),
            Err(e) => {
                debug!("Not managing terminal: {}", e);
                None
            }
        }
    }

    /// Parent-side half of the handoff.
    ///
    /// Racing with [`claim_foreground`] is fine: both set the same group.
    pub(crate) fn hand_to(&self, pgid: Pid) {
        if let Err(e) = with_sigttou_ignored(|| tcsetpgrp(io::stdin(), pgid)) {
            // The shell may already be gone.
            debug!("Could not hand terminal to group {}: {}", pgid, e);
        }
    }

    /// Take the foreground back and restore the saved attributes.
    pub(crate) fn reclaim(&self) {
        if let Err(e) = with_sigttou_ignored(|| tcsetpgrp(io::stdin(), self.owner)) {
            warn!("Failed to reclaim terminal foreground: {}", e);
        }
        if let Err(e) = tcsetattr(io::stdin(), SetArg::TCSADRAIN, &self.saved) {
            warn!("Failed to restore terminal attributes: {}", e);
        }
    }
}
