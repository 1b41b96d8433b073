use std::ffi::{CString, OsStr};
use std::io;
use std::os::unix::ffi::OsStrExt;

use tracing::debug;

use crate::control::{self, Context};
use crate::error::ShellError;
use crate::job_control;
use crate::jobs::{JobLabel, JobStatus, JobStore, Pid};
use crate::parser::Command;
use crate::redirect::OutputTarget;
use crate::signals;

/// Mode bits for files created by `>` and `>>`.
const OUTPUT_FILE_MODE: libc::c_uint = 0o600;

/// Exit status of a child whose exec failed.
const EXEC_FAILED: libc::c_int = 127;

/// What the child does when a redirection cannot be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    /// Report and exit before exec.
    #[default]
    Strict,
    /// Report and exec anyway with the descriptor left as it was.
    Permissive,
}

/// A command converted to C strings ahead of the fork, so the child only has
/// to make syscalls.
#[derive(Debug)]
struct Prepared {
    argv: Vec<CString>,
    input: Option<CString>,
    output: Option<(CString, libc::c_int)>,
}

impl Prepared {
    fn new(command: &Command) -> Result<Self, ShellError> {
        let argv = command
            .argv
            .iter()
            .map(|arg| c_string(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let input = command
            .redirections
            .input
            .as_deref()
            .map(c_string)
            .transpose()?;

        let output = match &command.redirections.output {
            Some(target) => {
                let mode = match target {
                    OutputTarget::Truncate(_) => libc::O_TRUNC,
                    OutputTarget::Append(_) => libc::O_APPEND,
                };
                let flags = libc::O_WRONLY | libc::O_CREAT | mode;
                Some((c_string(target.path())?, flags))
            }
            None => None,
        };

        Ok(Self {
            argv,
            input,
            output,
        })
    }
}

fn c_string(s: &OsStr) -> Result<CString, ShellError> {
    CString::new(s.as_bytes())
        .map_err(|_| ShellError::Syntax(format!("'{}' contains a NUL byte", s.to_string_lossy())))
}

/// Fork and exec `command`, then either register it as a background job or
/// wait for it in the foreground.
///
/// Every failure short of a broken standard output is reported on `cx.err`
/// and leaves the interpreter ready for the next line.
pub fn launch<S: JobStore>(
    cx: &mut Context<'_, S>,
    command: &Command,
    policy: RedirectPolicy,
) -> io::Result<()> {
    let prepared = match Prepared::new(command) {
        Ok(prepared) => prepared,
        Err(e) => {
            let _ = writeln!(cx.err, "{e}");
            return Ok(());
        }
    };

    // Nothing buffered may be duplicated into the child.
    cx.out.flush()?;
    let _ = cx.err.flush();

    let pid = unsafe { libc::fork() };
    if pid < 0 {
        let _ = writeln!(cx.err, "{}", ShellError::Fork(io::Error::last_os_error()));
        return Ok(());
    }
    if pid == 0 {
        exec_child(&prepared, policy);
    }

    debug!(pid, program = ?command.program(), background = command.background, "launched");

    // Mirror the child's setpgid so the group exists before we use it.
    if let Err(e) = job_control::set_process_group(pid, pid) {
        let _ = writeln!(cx.err, "setpgid: {e}");
    }

    // The record only needs a printable name for `jobs`.
    let name = command.program().to_string_lossy();
    if command.background {
        register_background(cx, pid, &name)
    } else {
        control::run_in_foreground(cx, pid, &name)
    }
}

fn register_background<S: JobStore>(
    cx: &mut Context<'_, S>,
    pid: Pid,
    program: &str,
) -> io::Result<()> {
    let id = cx.ids.allocate();
    match cx.jobs.insert(id, pid, JobStatus::Running, program) {
        Ok(()) => {
            writeln!(cx.out, "{}", JobLabel { job: Some(id), pid })?;
            cx.out.flush()
        }
        Err(e) => {
            // The process keeps running, untracked.
            let _ = writeln!(cx.err, "{e}");
            Ok(())
        }
    }
}

/// The child half of the launch. Never returns.
fn exec_child(prepared: &Prepared, policy: RedirectPolicy) -> ! {
    if let Err(e) = signals::restore_in_child() {
        child_exit("signal", &e, 1);
    }

    if unsafe { libc::setpgid(0, 0) } == -1 {
        child_exit("setpgid", &io::Error::last_os_error(), 1);
    }

    if let Some(path) = &prepared.input {
        if let Err(e) = redirect_fd(path, libc::O_RDONLY, libc::STDIN_FILENO) {
            child_redirect_failed(path, &e, policy);
        }
    }

    if let Some((path, flags)) = &prepared.output {
        if let Err(e) = redirect_fd(path, *flags, libc::STDOUT_FILENO) {
            child_redirect_failed(path, &e, policy);
        }
    }

    let mut ptrs: Vec<*const libc::c_char> = prepared.argv.iter().map(|a| a.as_ptr()).collect();
    ptrs.push(std::ptr::null());

    unsafe { libc::execvp(ptrs[0], ptrs.as_ptr()) };

    let err = io::Error::last_os_error();
    child_exit(
        &format!("execvp: {}", prepared.argv[0].to_string_lossy()),
        &err,
        EXEC_FAILED,
    );
}

/// Open `path` and put it on `target_fd`.
fn redirect_fd(path: &CString, flags: libc::c_int, target_fd: libc::c_int) -> io::Result<()> {
    let fd = unsafe { libc::open(path.as_ptr(), flags, OUTPUT_FILE_MODE) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    if fd != target_fd {
        let rc = unsafe { libc::dup2(fd, target_fd) };
        let dup_err = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        if rc < 0 {
            return Err(dup_err);
        }
    }
    Ok(())
}

fn child_redirect_failed(path: &CString, err: &io::Error, policy: RedirectPolicy) {
    let what = format!("open: {}", path.to_string_lossy());
    match policy {
        RedirectPolicy::Strict => child_exit(&what, err, 1),
        RedirectPolicy::Permissive => eprintln!("{what}: {err}"),
    }
}

fn child_exit(what: &str, err: &io::Error, code: libc::c_int) -> ! {
    eprintln!("{what}: {err}");
    // _exit: skip atexit handlers and buffered state inherited from the parent.
    unsafe { libc::_exit(code) }
}
