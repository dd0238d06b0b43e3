//! Job state machine types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobInput;

/// Lifecycle state of a job.
///
/// ```text
/// Submitted -> Running -> Succeeded
///                 |
///                 +-----> Failed
/// ```
///
/// No state is revisited; `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Position in the lifecycle; terminal states share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobState::Submitted => 0,
            JobState::Running => 1,
            JobState::Succeeded | JobState::Failed => 2,
        }
    }

    /// The only legal edges of the state machine.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Submitted, JobState::Running)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(JobState::Submitted),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state: {}", other)),
        }
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// The executor reported a failure status, errored, or crashed.
    ExecutionFailure,
    /// The executor did not return within its time budget.
    ExecutionTimeout,
    /// The executor returned a status that is neither success nor a defined failure.
    UnclassifiedOutcome,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCause::ExecutionFailure => "execution failure",
            FailureCause::ExecutionTimeout => "execution timeout",
            FailureCause::UnclassifiedOutcome => "unclassified executor outcome",
        }
    }

    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureCause::ExecutionFailure => "execution_failure",
            FailureCause::ExecutionTimeout => "execution_timeout",
            FailureCause::UnclassifiedOutcome => "unclassified_outcome",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object written to the durable sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Sink key, e.g. `ffmpeg/<video_id>/<file>`.
    pub key: String,
    /// Public (CDN) URL of the object.
    pub url: String,
    pub size_bytes: u64,
}

/// Reference to a job's output in the durable sink. Payloads never pass
/// through the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    /// Public URL of the folder holding the outputs.
    pub location: String,
    /// Output name -> stored object.
    #[serde(default)]
    pub files: BTreeMap<String, StoredObject>,
}

/// Terminal result of a job. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobResult {
    Succeeded {
        status_code: u16,
        output: OutputRef,
    },
    Failed {
        /// `None` when the executor never reported (timeout, crash).
        status_code: Option<u16>,
        cause: FailureCause,
        detail: String,
    },
}

impl JobResult {
    pub fn failed(cause: FailureCause, status_code: Option<u16>, detail: impl Into<String>) -> Self {
        JobResult::Failed {
            status_code,
            cause,
            detail: detail.into(),
        }
    }

    /// Terminal state this result moves a job into.
    pub fn state(&self) -> JobState {
        match self {
            JobResult::Succeeded { .. } => JobState::Succeeded,
            JobResult::Failed { .. } => JobState::Failed,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            JobResult::Succeeded { status_code, .. } => Some(*status_code),
            JobResult::Failed { status_code, .. } => *status_code,
        }
    }

    pub fn output(&self) -> Option<&OutputRef> {
        match self {
            JobResult::Succeeded { output, .. } => Some(output),
            JobResult::Failed { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<FailureCause> {
        match self {
            JobResult::Succeeded { .. } => None,
            JobResult::Failed { cause, .. } => Some(*cause),
        }
    }
}

/// A unit of submitted work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (UUID), assigned at admission.
    pub id: String,

    pub state: JobState,

    pub input: JobInput,

    /// Present only once the job is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,

    /// User id of the identity that submitted the job.
    pub submitted_by: String,

    /// Job whose output triggered this one (second pipeline stage).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Human-readable failure reason: `"<cause>: <detail>"`.
    pub fn failure_reason(&self) -> Option<String> {
        match &self.result {
            Some(JobResult::Failed { cause, detail, .. }) if detail.is_empty() => {
                Some(cause.to_string())
            }
            Some(JobResult::Failed { cause, detail, .. }) => Some(format!("{}: {}", cause, detail)),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&OutputRef> {
        self.result.as_ref().and_then(JobResult::output)
    }
}
