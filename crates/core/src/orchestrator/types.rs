//! Types for the job orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::job::JobStoreError;

/// Errors returned by [`super::JobOrchestrator`].
///
/// Execution-time failures never appear here; they are recorded in the
/// job's result.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job store error: {0}")]
    Store(JobStoreError),
}

impl From<JobStoreError> for OrchestratorError {
    fn from(e: JobStoreError) -> Self {
        match e {
            JobStoreError::NotFound(id) => Self::JobNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// What startup recovery found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Jobs left in `submitted` that were re-dispatched.
    pub resumed: Vec<String>,
    /// Jobs left in `running` whose executor is gone; recorded as failed.
    pub interrupted: Vec<String>,
}
