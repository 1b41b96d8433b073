use std::fmt;

/// A child state change as reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
    Continued,
}

impl WaitStatus {
    /// Decode a raw `waitpid` status word.
    ///
    /// Returns `None` for a status that matches none of the four shapes.
    pub fn from_raw(raw_status: libc::c_int) -> Option<Self> {
        if libc::WIFEXITED(raw_status) {
            return Some(WaitStatus::Exited(libc::WEXITSTATUS(raw_status)));
        }

        if libc::WIFSIGNALED(raw_status) {
            return Some(WaitStatus::Signaled(libc::WTERMSIG(raw_status)));
        }

        if libc::WIFSTOPPED(raw_status) {
            return Some(WaitStatus::Stopped(libc::WSTOPSIG(raw_status)));
        }

        if libc::WIFCONTINUED(raw_status) {
            return Some(WaitStatus::Continued);
        }

        None
    }
}

/// The notification text that follows the job label, e.g.
/// `terminated with exit status 0`.
impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStatus::Exited(code) => write!(f, "terminated with exit status {code}"),
            WaitStatus::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            WaitStatus::Stopped(signal) => write!(f, "suspended by signal {signal}"),
            WaitStatus::Continued => f.write_str("resumed"),
        }
    }
}
