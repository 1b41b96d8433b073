//! Foreground and background transfer of control.
//!
//! The foreground path is the only place the interpreter blocks. Terminal
//! ownership is held by a [`ForegroundTerminalGuard`] so it comes back to the
//! interpreter on every way out of these functions.

use std::io::{self, Write};

use tracing::debug;

use crate::error::{JobTableError, ShellError};
use crate::job_control::{self, ForegroundTerminalGuard};
use crate::jobs::{JobId, JobIds, JobLabel, JobStatus, JobStore, Pid};
use crate::status::WaitStatus;

/// Everything the controllers need to touch besides the process itself.
pub struct Context<'a, S: JobStore> {
    pub jobs: &'a mut S,
    pub ids: &'a mut JobIds,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl<S: JobStore> Context<'_, S> {
    fn report(&mut self, error: impl std::fmt::Display) {
        let _ = writeln!(self.err, "{error}");
    }
}

/// Give the terminal to a freshly launched, untracked child and wait for it.
///
/// A failed terminal hand-off is reported but the wait still happens: the
/// child is already running and must not be left unobserved.
pub fn run_in_foreground<S: JobStore>(
    cx: &mut Context<'_, S>,
    pid: Pid,
    command: &str,
) -> io::Result<()> {
    let _terminal = match ForegroundTerminalGuard::new(pid) {
        Ok(guard) => Some(guard),
        Err(e) => {
            cx.report(ShellError::Terminal(e));
            None
        }
    };
    await_foreground(cx, pid, None, command)
}

/// `fg`: bring a tracked job to the foreground, continue it and wait.
///
/// If the terminal cannot be handed over the job is not continued and the
/// table is left alone.
pub fn resume_in_foreground<S: JobStore>(
    cx: &mut Context<'_, S>,
    id: JobId,
) -> io::Result<()> {
    let Some(job) = cx.jobs.lookup_job(id) else {
        cx.report(JobTableError::NoSuchJob(id));
        return Ok(());
    };
    let (pid, command) = (job.pid, job.command.clone());

    let _terminal = match ForegroundTerminalGuard::new(pid) {
        Ok(guard) => guard,
        Err(e) => {
            cx.report(ShellError::Terminal(e));
            return Ok(());
        }
    };

    if let Err(e) = job_control::send_continue_to_group(pid) {
        cx.report(ShellError::Signal(e));
        return Ok(());
    }
    if let Err(e) = cx.jobs.update_status_by_job_id(id, JobStatus::Running) {
        cx.report(e);
    }
    debug!(job = id, pid, "job continued in foreground");

    await_foreground(cx, pid, Some(id), &command)
}

/// `bg`: continue a tracked job without waiting for it. The table is only
/// updated once the continue signal has been delivered.
pub fn resume_in_background<S: JobStore>(cx: &mut Context<'_, S>, id: JobId) {
    let Some(pid) = cx.jobs.lookup_process_id(id) else {
        cx.report(JobTableError::NoSuchJob(id));
        return;
    };

    if let Err(e) = job_control::send_continue_to_group(pid) {
        cx.report(ShellError::Signal(e));
        return;
    }
    if let Err(e) = cx.jobs.update_status_by_job_id(id, JobStatus::Running) {
        cx.report(e);
        return;
    }
    debug!(job = id, pid, "job continued in background");
}

/// Block until `pid` exits, dies, or stops, then bring the table in line.
///
/// `tracked` is the job id when `pid` already has a record.
fn await_foreground<S: JobStore>(
    cx: &mut Context<'_, S>,
    pid: Pid,
    tracked: Option<JobId>,
    command: &str,
) -> io::Result<()> {
    let status = match job_control::wait_for_pid(pid) {
        Ok(status) => status,
        Err(e) => {
            cx.report(ShellError::Wait(e));
            return Ok(());
        }
    };
    apply_foreground_status(cx, pid, tracked, command, status)
}

fn apply_foreground_status<S: JobStore>(
    cx: &mut Context<'_, S>,
    pid: Pid,
    tracked: Option<JobId>,
    command: &str,
    status: WaitStatus,
) -> io::Result<()> {
    debug!(pid, ?tracked, ?status, "foreground job changed state");
    match status {
        WaitStatus::Exited(_) => {
            if let Some(id) = tracked {
                if let Err(e) = cx.jobs.remove_by_job_id(id) {
                    cx.report(e);
                }
            }
        }
        WaitStatus::Signaled(_) => {
            writeln!(cx.out, "{} {status}", JobLabel { job: tracked, pid })?;
            if let Some(id) = tracked {
                if let Err(e) = cx.jobs.remove_by_job_id(id) {
                    cx.report(e);
                }
            }
        }
        WaitStatus::Stopped(_) => {
            let job = match tracked {
                Some(id) => {
                    if let Err(e) = cx.jobs.update_status_by_job_id(id, JobStatus::Stopped) {
                        cx.report(e);
                    }
                    Some(id)
                }
                None => {
                    let id = cx.ids.allocate();
                    match cx.jobs.insert(id, pid, JobStatus::Stopped, command) {
                        Ok(()) => Some(id),
                        Err(e) => {
                            cx.report(e);
                            None
                        }
                    }
                }
            };
            writeln!(cx.out, "{} {status}", JobLabel { job, pid })?;
        }
        WaitStatus::Continued => {}
    }
    cx.out.flush()
}
