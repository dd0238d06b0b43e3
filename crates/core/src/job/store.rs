//! Job storage trait and types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{Job, JobInput, JobResult, JobState};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    /// `from -> to` is not an edge of the state machine.
    #[error("Illegal transition for job {job_id}: {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: JobState,
        to: JobState,
    },

    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub input: JobInput,
    /// User id of the submitting identity.
    pub submitted_by: String,
    /// Set for jobs created by the second pipeline stage.
    pub parent_id: Option<String>,
}

/// A state transition with the data it introduces.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// `Submitted -> Running`; sets `started_at`.
    Start { at: DateTime<Utc> },
    /// `Running -> Succeeded | Failed`; sets `result` and `finished_at`.
    Finish {
        result: JobResult,
        at: DateTime<Utc>,
    },
}

impl JobUpdate {
    pub fn start() -> Self {
        JobUpdate::Start { at: Utc::now() }
    }

    pub fn finish(result: JobResult) -> Self {
        JobUpdate::Finish {
            result,
            at: Utc::now(),
        }
    }

    /// State the job is in after this update applies.
    pub fn target_state(&self) -> JobState {
        match self {
            JobUpdate::Start { .. } => JobState::Running,
            JobUpdate::Finish { result, .. } => result.state(),
        }
    }
}

/// Outcome of a compare-and-set transition.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The update was applied; carries the job as stored.
    Applied(Job),
    /// The stored state no longer matched the expected one.
    Stale { current: JobState },
}

impl CasOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CasOutcome::Applied(_))
    }
}

/// Filter for querying jobs.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub submitted_by: Option<String>,
    pub parent_id: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFilter {
    pub fn new() -> Self {
        Self {
            state: None,
            submitted_by: None,
            parent_id: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_submitted_by(mut self, submitted_by: impl Into<String>) -> Self {
        self.submitted_by = Some(submitted_by.into());
        self
    }

    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Durable record of jobs.
///
/// State changes go exclusively through [`JobStore::compare_and_set`], which
/// is the only synchronisation point between concurrent writers of a job.
pub trait JobStore: Send + Sync {
    /// Insert a new job in `Submitted`.
    fn create(&self, request: CreateJobRequest) -> Result<Job, JobStoreError>;

    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError>;

    /// List jobs matching the filter, newest first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError>;

    fn count(&self, filter: &JobFilter) -> Result<i64, JobStoreError>;

    /// Apply `update` only if the job is currently in `expected`.
    ///
    /// Fails with [`JobStoreError::IllegalTransition`] when `expected` to the
    /// update's target state is not a legal edge, regardless of stored state.
    fn compare_and_set(
        &self,
        id: &str,
        expected: JobState,
        update: JobUpdate,
    ) -> Result<CasOutcome, JobStoreError>;
}

/// Reject updates that would move a job along an illegal edge.
pub(crate) fn check_transition(
    id: &str,
    expected: JobState,
    update: &JobUpdate,
) -> Result<(), JobStoreError> {
    let target = update.target_state();
    if expected.can_transition_to(target) {
        Ok(())
    } else {
        Err(JobStoreError::IllegalTransition {
            job_id: id.to_string(),
            from: expected,
            to: target,
        })
    }
}
