//! Trait definitions for the executor module.

use async_trait::async_trait;

use super::error::ExecutorError;
use super::types::{ExecutionBudget, ExecutionReport};
use crate::job::JobInput;

/// Runs the transformation for one job within a resource budget.
///
/// Implementations are not required to be idempotent; the orchestrator
/// invokes them at most once per job.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Returns the name of this executor implementation.
    fn name(&self) -> &str;

    async fn execute(
        &self,
        job_id: &str,
        input: &JobInput,
        budget: &ExecutionBudget,
    ) -> Result<ExecutionReport, ExecutorError>;

    /// Validates that the executor is properly configured and ready.
    async fn validate(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}
