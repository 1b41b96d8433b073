use std::io::{self, Write};

use tracing::debug;

use crate::error::JobTableError;
use crate::job_control;
use crate::jobs::{JobLabel, JobStatus, JobStore, Pid};
use crate::status::WaitStatus;

/// A source of child state changes. `Ok(None)` means nothing more is pending.
pub trait ChildEvents {
    fn next_event(&mut self) -> io::Result<Option<(Pid, WaitStatus)>>;
}

/// Reads events straight from `waitpid(-1, WNOHANG | WUNTRACED | WCONTINUED)`.
pub struct OsChildEvents;

impl ChildEvents for OsChildEvents {
    fn next_event(&mut self) -> io::Result<Option<(Pid, WaitStatus)>> {
        job_control::poll_any_child()
    }
}

/// Drain every pending child state change into the job table.
///
/// Never blocks. Only a failed write to `out` is returned as an error; every
/// other problem becomes one line on `err`.
pub fn sweep<S: JobStore>(
    events: &mut impl ChildEvents,
    jobs: &mut S,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    loop {
        match events.next_event() {
            Ok(Some((pid, status))) => apply_event(pid, status, jobs, out, err)?,
            Ok(None) => break,
            Err(e) => {
                let _ = writeln!(err, "waitpid: {e}");
                break;
            }
        }
    }
    out.flush()
}

/// Report one state change and apply it to the table.
pub fn apply_event<S: JobStore>(
    pid: Pid,
    status: WaitStatus,
    jobs: &mut S,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    let job = jobs.lookup_job_id(pid);
    debug!(pid, ?job, ?status, "child changed state");
    writeln!(out, "{} {status}", JobLabel { job, pid })?;

    if job.is_none() {
        let _ = writeln!(err, "{}", JobTableError::NoSuchProcess(pid));
        return Ok(());
    }

    let result = match status {
        WaitStatus::Exited(_) | WaitStatus::Signaled(_) => jobs.remove_by_process_id(pid).map(drop),
        WaitStatus::Stopped(_) => jobs.update_status_by_process_id(pid, JobStatus::Stopped),
        WaitStatus::Continued => jobs.update_status_by_process_id(pid, JobStatus::Running),
    };
    if let Err(e) = result {
        let _ = writeln!(err, "{e}");
    }
    Ok(())
}
