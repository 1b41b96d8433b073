use std::io;

use thiserror::Error;

use crate::jobs::{JobId, Pid};

/// Failures reported by a [`crate::jobs::JobStore`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobTableError {
    #[error("job %{0} is already tracked")]
    DuplicateJob(JobId),

    #[error("process {0} is already tracked")]
    DuplicateProcess(Pid),

    #[error("%{0}: no such job")]
    NoSuchJob(JobId),

    #[error("no job for process {0}")]
    NoSuchProcess(Pid),
}

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("fork: {0}")]
    Fork(io::Error),

    #[error("waitpid: {0}")]
    Wait(io::Error),

    #[error("kill: {0}")]
    Signal(io::Error),

    #[error("tcsetpgrp: {0}")]
    Terminal(io::Error),

    #[error("signal: {0}")]
    SignalPolicy(io::Error),

    #[error("{0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_name_the_failing_call() {
        let denied = || io::Error::from_raw_os_error(libc::EPERM);
        assert!(ShellError::Signal(denied()).to_string().starts_with("kill: "));
        assert!(ShellError::Terminal(denied()).to_string().starts_with("tcsetpgrp: "));
        assert!(ShellError::Wait(denied()).to_string().starts_with("waitpid: "));
        assert_eq!(
            ShellError::Syntax("no command given".into()).to_string(),
            "syntax error: no command given"
        );
    }

    #[test]
    fn table_errors_render_on_their_own() {
        assert_eq!(JobTableError::NoSuchJob(3).to_string(), "%3: no such job");
        assert_eq!(
            JobTableError::DuplicateProcess(42).to_string(),
            "process 42 is already tracked"
        );
    }
}
