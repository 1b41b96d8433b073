//! Thin wrappers over the process-group, signal and terminal syscalls.

use std::io;

use tracing::{debug, trace};

use crate::jobs::Pid;
use crate::status::WaitStatus;

/// Run a syscall until it stops failing with EINTR.
fn retry_eintr(mut call: impl FnMut() -> libc::c_int) -> io::Result<libc::c_int> {
    loop {
        let rc = call();
        if rc >= 0 {
            return Ok(rc);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

fn check_group(pgid: Pid) -> io::Result<()> {
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process group id",
        ));
    }
    Ok(())
}

/// Parent-side `setpgid(pid, pgid)`.
///
/// EACCES (child already exec'd) and ESRCH (child already gone) mean the
/// child's own call has settled it, so they count as success.
pub(crate) fn set_process_group(pid: Pid, pgid: Pid) -> io::Result<()> {
    match retry_eintr(|| unsafe { libc::setpgid(pid, pgid) }) {
        Ok(_) => Ok(()),
        Err(e) if matches!(e.raw_os_error(), Some(libc::EACCES | libc::ESRCH)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Send SIGCONT to every process in the group led by `pgid`.
pub(crate) fn send_continue_to_group(pgid: Pid) -> io::Result<()> {
    check_group(pgid)?;
    retry_eintr(|| unsafe { libc::kill(-pgid, libc::SIGCONT) })?;
    trace!(pgid, "sent SIGCONT to group");
    Ok(())
}

/// Hands the controlling terminal to a job's process group for as long as the
/// guard lives; dropping it gives the terminal back to the interpreter.
///
/// When standard input is not a terminal there is nothing to hand over and the
/// guard does nothing.
pub(crate) struct ForegroundTerminalGuard {
    tty_fd: Option<libc::c_int>,
    shell_pgid: Pid,
}

impl ForegroundTerminalGuard {
    pub(crate) fn new(target_pgid: Pid) -> io::Result<Self> {
        let is_tty = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
        let tty_fd = is_tty.then_some(libc::STDIN_FILENO);
        let guard = Self {
            tty_fd,
            shell_pgid: unsafe { libc::getpgrp() },
        };

        if let Some(fd) = guard.tty_fd {
            set_terminal_foreground(fd, target_pgid)?;
            debug!(pgid = target_pgid, "terminal handed to job");
        }
        Ok(guard)
    }
}

impl Drop for ForegroundTerminalGuard {
    fn drop(&mut self) {
        let Some(fd) = self.tty_fd else {
            return;
        };
        match set_terminal_foreground(fd, self.shell_pgid) {
            Ok(()) => debug!(pgid = self.shell_pgid, "terminal reclaimed"),
            Err(e) => eprintln!("tcsetpgrp: {e}"),
        }
    }
}

// SIGTTOU is ignored by the interpreter, so calling this from a background
// group does not stop us.
fn set_terminal_foreground(fd: libc::c_int, pgid: Pid) -> io::Result<()> {
    check_group(pgid)?;
    retry_eintr(|| unsafe { libc::tcsetpgrp(fd, pgid) })?;
    Ok(())
}

/// Block until `pid` exits, is killed, or stops.
pub(crate) fn wait_for_pid(pid: Pid) -> io::Result<WaitStatus> {
    let mut raw_status: libc::c_int = 0;
    loop {
        retry_eintr(|| unsafe { libc::waitpid(pid, &mut raw_status, libc::WUNTRACED) })?;
        match WaitStatus::from_raw(raw_status) {
            Some(WaitStatus::Continued) | None => continue,
            Some(status) => {
                trace!(pid, ?status, "foreground wait returned");
                return Ok(status);
            }
        }
    }
}

/// Non-blocking check for any child whose state changed, including stops and
/// continues. `Ok(None)` means nothing is pending or there are no children.
pub(crate) fn poll_any_child() -> io::Result<Option<(Pid, WaitStatus)>> {
    const FLAGS: libc::c_int = libc::WNOHANG | libc::WUNTRACED | libc::WCONTINUED;
    let mut raw_status: libc::c_int = 0;
    loop {
        let pid = match retry_eintr(|| unsafe { libc::waitpid(-1, &mut raw_status, FLAGS) }) {
            Ok(0) => return Ok(None),
            Ok(pid) => pid,
            Err(e) if e.raw_os_error() == Some(libc::ECHILD) => return Ok(None),
            Err(e) => return Err(e),
        };
        if let Some(status) = WaitStatus::from_raw(raw_status) {
            return Ok(Some((pid, status)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_rejects_non_positive_group() {
        let err = send_continue_to_group(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(send_continue_to_group(-5).is_err());
    }

    #[test]
    fn retry_passes_through_success_and_real_errors() {
        assert_eq!(retry_eintr(|| 7).unwrap(), 7);

        let mut calls = 0;
        let err = retry_eintr(|| {
            calls += 1;
            unsafe { libc::close(-1) }
        })
        .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        assert_eq!(calls, 1);
    }

    #[test]
    fn wait_reports_exit_code() {
        let child = std::process::Command::new("sh")
            .args(["-c", "exit 4"])
            .spawn()
            .expect("spawn sh");
        let status = wait_for_pid(child.id() as Pid).unwrap();
        assert_eq!(status, WaitStatus::Exited(4));
    }

    #[test]
    fn wait_on_unknown_pid_is_an_error() {
        // Not our child.
        let err = wait_for_pid(1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ECHILD));
    }

    #[test]
    fn guard_without_terminal_is_inert() {
        // Test runners give us a pipe or /dev/null on stdin; only check the
        // non-terminal case.
        if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
            return;
        }
        let guard = ForegroundTerminalGuard::new(999_999).unwrap();
        assert!(guard.tty_fd.is_none());
    }
}
