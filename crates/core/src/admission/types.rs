//! Types for the admission gateway.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthError, AuthRequest};
use crate::job::{JobState, JobStoreError, ValidationError};

/// A client's request to run a job.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Headers and source address, for the Authorizer.
    pub auth: AuthRequest,
    /// The job payload as submitted.
    pub payload: serde_json::Value,
}

impl SubmitRequest {
    pub fn new<I, K, V>(headers: I, source_ip: IpAddr, payload: serde_json::Value) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            auth: AuthRequest::from_headers(headers, source_ip),
            payload,
        }
    }
}

/// Returned to the client on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub id: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
}

/// Synchronous rejection of a submission. No job exists for it.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to record job: {0}")]
    Store(#[from] JobStoreError),
}

impl AdmissionError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.reason(),
            Self::Validation(_) => "validation",
            Self::Store(_) => "store",
        }
    }
}
