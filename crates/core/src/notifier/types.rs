//! Completion notification payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{Job, JobState, OutputRef};

/// Emitted once per terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionNotification {
    pub job_id: String,
    pub state: JobState,
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Where the outputs live; set for `succeeded` jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputRef>,
    /// `"<cause>: <detail>"`; set for `failed` jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub submitted_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl CompletionNotification {
    /// Build the notification for a terminal job; `None` otherwise.
    pub fn from_job(job: &Job) -> Option<Self> {
        if !job.state.is_terminal() {
            return None;
        }

        Some(Self {
            job_id: job.id.clone(),
            state: job.state,
            video_id: job.input.video_id.clone(),
            status_code: job.result.as_ref().and_then(|r| r.status_code()),
            output: job.output().cloned(),
            failure: job.failure_reason(),
            submitted_by: job.submitted_by.clone(),
            parent_id: job.parent_id.clone(),
            finished_at: job.finished_at.unwrap_or(job.updated_at),
        })
    }
}
