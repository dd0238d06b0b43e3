//! Admission gateway implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::types::{AdmissionError, JobHandle, SubmitRequest};
use crate::auth::{AuthError, AuthRequest, Authenticator, Identity};
use crate::job::{CreateJobRequest, JobInput, JobStore, ValidationError};
use crate::metrics;
use crate::orchestrator::JobOrchestrator;

/// Accepts jobs from clients and from the pipeline itself.
pub struct AdmissionGateway {
    authenticator: Arc<dyn Authenticator>,
    orchestrator: Arc<JobOrchestrator>,
    auth_timeout: Duration,
}

impl AdmissionGateway {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        orchestrator: Arc<JobOrchestrator>,
        auth_timeout: Duration,
    ) -> Self {
        Self {
            authenticator,
            orchestrator,
            auth_timeout,
        }
    }

    pub fn orchestrator(&self) -> &Arc<JobOrchestrator> {
        &self.orchestrator
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.orchestrator.store()
    }

    /// Authorize, validate and record a client submission.
    ///
    /// On success the job is already `submitted` and being advanced in the
    /// background; the call does not wait for execution.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobHandle, AdmissionError> {
        let identity = self.authorize(&request.auth).await?;
        let input = JobInput::from_payload(&request.payload).map_err(|e| self.rejected(e.into()))?;
        self.admit(input, identity.user_id, None, "client")
    }

    /// Like [`AdmissionGateway::submit`] for a raw JSON body.
    ///
    /// The credential is checked before the body is parsed, so an
    /// unauthenticated caller never learns whether its payload was valid.
    pub async fn submit_body(
        &self,
        auth: &AuthRequest,
        body: &[u8],
    ) -> Result<JobHandle, AdmissionError> {
        let identity = self.authorize(auth).await?;
        self.admit_body(identity, body)
    }

    /// Validate and record a raw JSON body for an already authorized caller.
    pub fn admit_body(
        &self,
        identity: Identity,
        body: &[u8],
    ) -> Result<JobHandle, AdmissionError> {
        let payload: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
            self.rejected(ValidationError::Malformed(format!("invalid JSON: {}", e)).into())
        })?;
        let input = JobInput::from_payload(&payload).map_err(|e| self.rejected(e.into()))?;
        self.admit(input, identity.user_id, None, "client")
    }

    /// Trusted entry point for jobs created by the pipeline (second stage).
    ///
    /// Skips the Authorizer; validation is the same as for clients.
    pub fn admit_chained(
        &self,
        input: JobInput,
        parent_id: &str,
    ) -> Result<JobHandle, AdmissionError> {
        input.validate().map_err(|e| self.rejected(e.into()))?;
        self.admit(
            input,
            Identity::pipeline().user_id,
            Some(parent_id.to_string()),
            "chained",
        )
    }

    /// One Authorizer call, bounded by the configured timeout, never retried.
    pub async fn authorize(&self, request: &AuthRequest) -> Result<Identity, AdmissionError> {
        let result = match timeout(self.auth_timeout, self.authenticator.authenticate(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(AuthError::ServiceUnavailable(format!(
                "no answer within {} ms",
                self.auth_timeout.as_millis()
            ))),
        };

        result.map_err(|e| {
            if !e.is_rejection() {
                warn!(error = %e, source_ip = %request.source_ip, "Authorizer unavailable");
            }
            self.rejected(e.into())
        })
    }

    fn admit(
        &self,
        input: JobInput,
        submitted_by: String,
        parent_id: Option<String>,
        origin: &str,
    ) -> Result<JobHandle, AdmissionError> {
        let job = self
            .store()
            .create(CreateJobRequest {
                input,
                submitted_by,
                parent_id,
            })
            .map_err(|e| self.rejected(e.into()))?;

        metrics::JOBS_SUBMITTED.with_label_values(&[origin]).inc();
        info!(
            job_id = %job.id,
            video_id = %job.input.video_id,
            submitted_by = %job.submitted_by,
            origin,
            "Job admitted"
        );

        self.orchestrator.spawn_advance(job.id.clone());

        Ok(JobHandle {
            id: job.id,
            state: job.state,
            created_at: job.created_at,
        })
    }

    fn rejected(&self, error: AdmissionError) -> AdmissionError {
        metrics::ADMISSION_REJECTED
            .with_label_values(&[error.reason()])
            .inc();
        debug!(reason = error.reason(), error = %error, "Submission rejected");
        error
    }
}
