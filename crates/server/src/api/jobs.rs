//! Job API handlers.

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use transflow_core::{
    AdmissionError, AuthError, Job, JobFilter, JobInput, JobResult, JobState, OutputRef,
};

use super::middleware::auth_request;
use crate::state::AppState;

/// Maximum allowed limit for job queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for job queries
const DEFAULT_LIMIT: i64 = 100;

/// Largest accepted submit body
const MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Filter by state
    pub state: Option<String>,
    /// Filter by submitter
    pub submitted_by: Option<String>,
    /// Filter by the first-stage job that produced this one
    pub parent_id: Option<String>,
    /// Maximum number of jobs to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for an accepted submission
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub state: JobState,
    pub created_at: String,
    pub status_url: String,
}

/// Response for job status
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub state: JobState,
    pub input: JobInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub submitted_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub updated_at: String,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            failure: job.failure_reason(),
            output: job.output().cloned(),
            id: job.id,
            state: job.state,
            input: job.input,
            result: job.result,
            submitted_by: job.submitted_by,
            parent_id: job.parent_id,
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            finished_at: job.finished_at.map(|t| t.to_rfc3339()),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(JobErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn admission_status(error: &AdmissionError) -> StatusCode {
    match error {
        AdmissionError::Auth(e) if e.is_rejection() => StatusCode::UNAUTHORIZED,
        AdmissionError::Auth(AuthError::ServiceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AdmissionError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AdmissionError::Validation(_) => StatusCode::BAD_REQUEST,
        AdmissionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a job. Returns 202 once the job is recorded; execution continues
/// in the background. The credential is checked before the body is read.
pub async fn submit_job(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body): (_, Body) = request.into_parts();
    let auth = auth_request(&parts.headers, &parts.extensions);

    let identity = match state.gateway().authorize(&auth).await {
        Ok(identity) => identity,
        Err(e) => return admission_error(e),
    };

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {} bytes: {}", MAX_BODY_BYTES, e),
            )
        }
    };

    match state.gateway().admit_body(identity, &bytes) {
        Ok(handle) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                status_url: format!("/api/v1/jobs/{}", handle.id),
                job_id: handle.id,
                state: handle.state,
                created_at: handle.created_at.to_rfc3339(),
            }),
        )
            .into_response(),
        Err(e) => admission_error(e),
    }
}

fn admission_error(error: AdmissionError) -> Response {
    let status = admission_status(&error);
    if status.is_server_error() {
        error!(error = %error, "Job submission failed");
    }
    error_response(status, error)
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, Response> {
    match state.job_store().get(&id) {
        Ok(Some(job)) => Ok(Json(JobResponse::from(job))),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Job not found: {}", id),
        )),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

/// List jobs with optional filters
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<ListJobsResponse>, Response> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = JobFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref state_filter) = params.state {
        let job_state: JobState = state_filter
            .parse()
            .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_state(job_state);
    }

    if let Some(ref submitted_by) = params.submitted_by {
        filter = filter.with_submitted_by(submitted_by);
    }

    if let Some(ref parent_id) = params.parent_id {
        filter = filter.with_parent_id(parent_id);
    }

    let store = state.job_store();
    let jobs = store
        .list(&filter)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    // Total ignores pagination
    let count_filter = JobFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = store
        .count(&count_filter)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(ListJobsResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}
