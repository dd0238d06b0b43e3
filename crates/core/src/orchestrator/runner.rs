//! Job orchestrator implementation.
//!
//! Drives one job at a time through `submitted -> running -> terminal`:
//! - Every transition is a compare-and-set on the job store.
//! - The executor runs in its own task; the orchestrator waits at most the
//!   budget's timeout for it.
//! - A result arriving after the timeout is offered to the store, rejected as
//!   stale, and dropped.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::executor::{ExecutionBudget, ExecutionReport, Executor, ExecutorError};
use crate::job::{
    CasOutcome, FailureCause, Job, JobFilter, JobResult, JobState, JobStore, JobUpdate,
};
use crate::metrics;
use crate::notifier::{CompletionNotification, CompletionNotifier};

use super::classify::classify;
use super::types::{OrchestratorError, RecoveryReport};

type ExecutionHandle = JoinHandle<Result<ExecutionReport, ExecutorError>>;

/// The job orchestrator: advances jobs and records their outcome.
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn Executor>,
    notifier: Arc<dyn CompletionNotifier>,
    budget: ExecutionBudget,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn Executor>,
        notifier: Arc<dyn CompletionNotifier>,
        budget: ExecutionBudget,
    ) -> Self {
        Self {
            store,
            executor,
            notifier,
            budget,
        }
    }

    pub fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Advance a job from `submitted` to a terminal state.
    ///
    /// Returns the state the job was left in. A job that is no longer
    /// `submitted` is left untouched and its current state returned.
    pub async fn advance(&self, job_id: &str) -> Result<JobState, OrchestratorError> {
        let job = match self
            .store
            .compare_and_set(job_id, JobState::Submitted, JobUpdate::start())?
        {
            CasOutcome::Applied(job) => job,
            CasOutcome::Stale { current } => {
                debug!(job_id = %job_id, state = %current, "Job already advanced");
                return Ok(current);
            }
        };

        info!(job_id = %job.id, video_id = %job.input.video_id, "Job running");
        metrics::JOBS_IN_FLIGHT.inc();
        let started = Instant::now();

        let mut handle = self.spawn_execution(&job);
        let (outcome, abandoned) = match timeout(self.budget.timeout, &mut handle).await {
            Ok(joined) => (flatten(joined), None),
            Err(_) => {
                warn!(
                    job_id = %job.id,
                    timeout_secs = self.budget.timeout.as_secs(),
                    "Executor exceeded its time budget"
                );
                let outcome = Err(ExecutorError::Timeout {
                    timeout_secs: self.budget.timeout.as_secs(),
                });
                (outcome, Some(handle))
            }
        };

        metrics::JOBS_IN_FLIGHT.dec();
        let result = classify(outcome);
        metrics::EXECUTION_DURATION
            .with_label_values(&[result.state().as_str()])
            .observe(started.elapsed().as_secs_f64());

        let state = self.finish(&job.id, result).await?;

        if let Some(handle) = abandoned {
            self.discard_late_result(job.id.clone(), handle);
        }

        Ok(state)
    }

    /// Spawn [`JobOrchestrator::advance`] on the runtime, logging failures.
    pub fn spawn_advance(self: &Arc<Self>, job_id: String) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.advance(&job_id).await {
                error!(job_id = %job_id, error = %e, "Failed to advance job");
            }
        })
    }

    /// Reconcile jobs left behind by a previous process.
    ///
    /// `running` jobs lost their executor and are recorded as failed;
    /// `submitted` jobs are dispatched again.
    pub async fn recover(self: &Arc<Self>) -> Result<RecoveryReport, OrchestratorError> {
        let mut report = RecoveryReport::default();

        let running = self
            .store
            .list(&JobFilter::new().with_state(JobState::Running).with_limit(i64::MAX))?;
        for job in running {
            let result = JobResult::failed(
                FailureCause::ExecutionFailure,
                None,
                "worker restarted before the job finished",
            );
            if self.finish(&job.id, result).await? == JobState::Failed {
                report.interrupted.push(job.id);
            }
        }

        let submitted = self.store.list(
            &JobFilter::new()
                .with_state(JobState::Submitted)
                .with_limit(i64::MAX),
        )?;
        for job in submitted {
            self.spawn_advance(job.id.clone());
            report.resumed.push(job.id);
        }

        if !report.interrupted.is_empty() || !report.resumed.is_empty() {
            info!(
                interrupted = report.interrupted.len(),
                resumed = report.resumed.len(),
                "Recovered jobs from previous run"
            );
        }

        Ok(report)
    }

    fn spawn_execution(&self, job: &Job) -> ExecutionHandle {
        let executor = Arc::clone(&self.executor);
        let job_id = job.id.clone();
        let input = job.input.clone();
        let budget = self.budget;

        tokio::spawn(async move { executor.execute(&job_id, &input, &budget).await })
    }

    /// Record the terminal result; notify only if this call made the transition.
    async fn finish(&self, job_id: &str, result: JobResult) -> Result<JobState, OrchestratorError> {
        let cause = result.cause().map(|c| c.label()).unwrap_or("none");

        match self
            .store
            .compare_and_set(job_id, JobState::Running, JobUpdate::finish(result))?
        {
            CasOutcome::Applied(job) => {
                metrics::JOBS_TERMINAL
                    .with_label_values(&[job.state.as_str(), cause])
                    .inc();

                match job.failure_reason() {
                    None => info!(job_id = %job.id, "Job succeeded"),
                    Some(reason) => warn!(job_id = %job.id, reason = %reason, "Job failed"),
                }

                self.notify(&job).await;
                Ok(job.state)
            }
            CasOutcome::Stale { current } => {
                warn!(
                    job_id = %job_id,
                    state = %current,
                    "Job left running before its result was recorded"
                );
                Ok(current)
            }
        }
    }

    async fn notify(&self, job: &Job) {
        let Some(notification) = CompletionNotification::from_job(job) else {
            return;
        };

        match self.notifier.notify(&notification).await {
            Ok(()) => metrics::NOTIFICATIONS.with_label_values(&["delivered"]).inc(),
            Err(e) => {
                metrics::NOTIFICATIONS.with_label_values(&["failed"]).inc();
                warn!(
                    job_id = %job.id,
                    notifier = self.notifier.name(),
                    error = %e,
                    "Completion notification failed"
                );
            }
        }
    }

    /// Let an abandoned execution finish in the background and offer its
    /// result to the store, which rejects it because the job is terminal.
    fn discard_late_result(&self, job_id: String, handle: ExecutionHandle) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let result = classify(flatten(handle.await));
            match store.compare_and_set(&job_id, JobState::Running, JobUpdate::finish(result)) {
                Ok(CasOutcome::Stale { current }) => {
                    metrics::LATE_RESULTS_DISCARDED.inc();
                    info!(job_id = %job_id, state = %current, "Discarded late executor result");
                }
                Ok(CasOutcome::Applied(_)) => {
                    error!(job_id = %job_id, "Late executor result replaced a missing terminal state");
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Failed to reconcile late executor result");
                }
            }
        });
    }
}

fn flatten(
    joined: Result<Result<ExecutionReport, ExecutorError>, JoinError>,
) -> Result<ExecutionReport, ExecutorError> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(ExecutorError::Crashed(format!("executor panicked: {}", e))),
        Err(e) => Err(ExecutorError::Crashed(e.to_string())),
    }
}
