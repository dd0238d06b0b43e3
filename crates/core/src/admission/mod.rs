//! Admission gateway: the authenticated entry point that creates jobs.
//!
//! A submission is authorized, validated, recorded as `submitted` and handed
//! to the orchestrator in the background. Any failure before the record is
//! written leaves no trace in the job store.

mod gateway;
mod types;

pub use gateway::AdmissionGateway;
pub use types::{AdmissionError, JobHandle, SubmitRequest};
