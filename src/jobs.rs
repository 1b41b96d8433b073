use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::trace;

use crate::error::JobTableError;

pub type JobId = usize;
pub type Pid = libc::pid_t;

/// The lifecycle state of a tracked job. Finished jobs are removed, never marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => f.write_str("Running"),
            JobStatus::Stopped => f.write_str("Stopped"),
        }
    }
}

/// A single tracked background or stopped process group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    /// Leader pid; also the process-group id.
    pub pid: Pid,
    pub status: JobStatus,
    pub command: String,
}

/// How a process is named in notifications: `[1] (4242)` when it is a tracked
/// job, `(4242)` when it has no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLabel {
    pub job: Option<JobId>,
    pub pid: Pid,
}

impl fmt::Display for JobLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.job {
            Some(id) => write!(f, "[{id}] ({})", self.pid),
            None => write!(f, "({})", self.pid),
        }
    }
}

/// Storage contract the job-control code runs against.
pub trait JobStore {
    fn insert(
        &mut self,
        id: JobId,
        pid: Pid,
        status: JobStatus,
        command: &str,
    ) -> Result<(), JobTableError>;
    fn update_status_by_job_id(&mut self, id: JobId, status: JobStatus)
    -> Result<(), JobTableError>;
    fn update_status_by_process_id(
        &mut self,
        pid: Pid,
        status: JobStatus,
    ) -> Result<(), JobTableError>;
    fn remove_by_job_id(&mut self, id: JobId) -> Result<Job, JobTableError>;
    fn remove_by_process_id(&mut self, pid: Pid) -> Result<Job, JobTableError>;
    fn lookup_process_id(&self, id: JobId) -> Option<Pid>;
    fn lookup_job_id(&self, pid: Pid) -> Option<JobId>;
    fn lookup_job(&self, id: JobId) -> Option<&Job>;
    /// All records, ascending by job id.
    fn list(&self) -> Vec<Job>;
}

/// Hands out job ids. Ids are never reused within one interpreter run,
/// including after the job they were given to is removed.
#[derive(Debug)]
pub struct JobIds {
    next: JobId,
}

impl Default for JobIds {
    fn default() -> Self {
        Self::new()
    }
}

impl JobIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Take the next id. Call only at the point of insertion.
    pub fn allocate(&mut self) -> JobId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// The shell's job table, keyed by job id with a pid index.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<JobId, Job>,
    by_pid: HashMap<Pid, JobId>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for JobTable {
    fn insert(
        &mut self,
        id: JobId,
        pid: Pid,
        status: JobStatus,
        command: &str,
    ) -> Result<(), JobTableError> {
        if self.jobs.contains_key(&id) {
            return Err(JobTableError::DuplicateJob(id));
        }
        if self.by_pid.contains_key(&pid) {
            return Err(JobTableError::DuplicateProcess(pid));
        }
        trace!(job = id, pid, %status, command, "job inserted");
        self.by_pid.insert(pid, id);
        self.jobs.insert(
            id,
            Job {
                id,
                pid,
                status,
                command: command.to_string(),
            },
        );
        Ok(())
    }

    fn update_status_by_job_id(
        &mut self,
        id: JobId,
        status: JobStatus,
    ) -> Result<(), JobTableError> {
        let job = self.jobs.get_mut(&id).ok_or(JobTableError::NoSuchJob(id))?;
        trace!(job = id, from = %job.status, to = %status, "job status updated");
        job.status = status;
        Ok(())
    }

    fn update_status_by_process_id(
        &mut self,
        pid: Pid,
        status: JobStatus,
    ) -> Result<(), JobTableError> {
        let id = self
            .lookup_job_id(pid)
            .ok_or(JobTableError::NoSuchProcess(pid))?;
        self.update_status_by_job_id(id, status)
    }

    fn remove_by_job_id(&mut self, id: JobId) -> Result<Job, JobTableError> {
        let job = self.jobs.remove(&id).ok_or(JobTableError::NoSuchJob(id))?;
        self.by_pid.remove(&job.pid);
        trace!(job = id, pid = job.pid, "job removed");
        Ok(job)
    }

    fn remove_by_process_id(&mut self, pid: Pid) -> Result<Job, JobTableError> {
        let id = self
            .lookup_job_id(pid)
            .ok_or(JobTableError::NoSuchProcess(pid))?;
        self.remove_by_job_id(id)
    }

    fn lookup_process_id(&self, id: JobId) -> Option<Pid> {
        self.jobs.get(&id).map(|job| job.pid)
    }

    fn lookup_job_id(&self, pid: Pid) -> Option<JobId> {
        self.by_pid.get(&pid).copied()
    }

    fn lookup_job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    fn list(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }
}
