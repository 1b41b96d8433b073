use std::io;

/// Keyboard and background-terminal signals the interpreter must not act on.
/// Children get these back at their default disposition before exec.
pub const JOB_CONTROL_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTSTP, libc::SIGTTOU];

/// Ignore the job-control signals in the interpreter process.
pub fn ignore_in_shell() -> io::Result<()> {
    set_disposition(libc::SIG_IGN)
}

/// Restore default handling in a freshly forked child.
///
/// Runs between fork and exec, so it only makes raw syscalls.
pub fn restore_in_child() -> io::Result<()> {
    set_disposition(libc::SIG_DFL)
}

fn set_disposition(handler: libc::sighandler_t) -> io::Result<()> {
    for signal in JOB_CONTROL_SIGNALS {
        let previous = unsafe { libc::signal(signal, handler) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
