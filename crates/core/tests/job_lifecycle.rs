//! Job lifecycle integration tests.
//!
//! These tests drive jobs through admission and the orchestrator:
//! submitted -> running -> succeeded | failed

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use transflow_core::{
    metrics,
    testing::{fixtures, MockAuthenticator, MockExecutor, MockResponse, RecordingNotifier},
    AdmissionGateway, CreateJobRequest, ExecutionBudget, ExecutionReport, FailureCause, Job,
    JobFilter, JobOrchestrator, JobResult, JobState, JobStore, JobUpdate, OrchestratorError,
    SqliteJobStore, SubmitRequest,
};

const TOKEN: &str = "secret-token";

/// Test helper wiring the pipeline around mock seams.
struct TestHarness {
    store: Arc<SqliteJobStore>,
    executor: MockExecutor,
    notifier: RecordingNotifier,
    orchestrator: Arc<JobOrchestrator>,
    gateway: Arc<AdmissionGateway>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    fn with_timeout(timeout: Duration) -> Self {
        let store = Arc::new(SqliteJobStore::in_memory().expect("Failed to create job store"));
        let executor = MockExecutor::new();
        let notifier = RecordingNotifier::new();
        let budget = ExecutionBudget {
            memory_mb: 512,
            timeout,
        };

        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::new(executor.clone()),
            Arc::new(notifier.clone()),
            budget,
        ));
        let gateway = Arc::new(AdmissionGateway::new(
            Arc::new(MockAuthenticator::new(TOKEN)),
            Arc::clone(&orchestrator),
            Duration::from_secs(1),
        ));

        Self {
            store,
            executor,
            notifier,
            orchestrator,
            gateway,
        }
    }

    async fn submit(&self, video_id: &str) -> String {
        let request = SubmitRequest::new(
            [("Authorization", format!("Bearer {}", TOKEN))],
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            fixtures::job_payload(video_id),
        );
        self.gateway
            .submit(request)
            .await
            .expect("submission should be accepted")
            .id
    }

    /// Record a job directly, bypassing admission (nothing advances it).
    fn create_job(&self, video_id: &str) -> String {
        self.store
            .create(CreateJobRequest {
                input: fixtures::job_input(video_id),
                submitted_by: "test".to_string(),
                parent_id: None,
            })
            .expect("Failed to create job")
            .id
    }

    async fn wait_for_terminal(&self, job_id: &str) -> Job {
        fixtures::wait_for_terminal(self.store.as_ref(), job_id, Duration::from_secs(5))
            .await
            .expect("job should reach a terminal state")
    }
}

fn cause_of(job: &Job) -> Option<FailureCause> {
    job.result.as_ref().and_then(|r| r.cause())
}

// =============================================================================
// Outcome classification
// =============================================================================

#[tokio::test]
async fn test_successful_job_records_output() {
    let harness = TestHarness::new();

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Succeeded);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());

    let output = job.output().expect("succeeded job has an output");
    assert_eq!(output.location, "http://mock-cdn/ffmpeg/clip-1/");
    assert_eq!(output.files["output_files"].key, "ffmpeg/clip-1/out.mp4");
    assert_eq!(job.result.as_ref().and_then(|r| r.status_code()), Some(200));
}

#[tokio::test]
async fn test_executor_failure_status_fails_job_with_detail() {
    let harness = TestHarness::new();
    harness
        .executor
        .set_response(MockResponse::Report(ExecutionReport::failure(
            500,
            "encoder exploded",
        )))
        .await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionFailure));
    assert_eq!(job.result.as_ref().and_then(|r| r.status_code()), Some(500));
    assert!(job
        .failure_reason()
        .is_some_and(|reason| reason.contains("encoder exploded")));
    assert!(job.output().is_none());
}

#[tokio::test]
async fn test_client_error_status_is_execution_failure() {
    let harness = TestHarness::new();
    harness
        .executor
        .set_response(MockResponse::Report(ExecutionReport::failure(
            400,
            "input not found",
        )))
        .await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionFailure));
}

#[tokio::test]
async fn test_unexpected_status_is_unclassified() {
    let harness = TestHarness::new();
    harness
        .executor
        .set_response(MockResponse::Report(ExecutionReport::status(0)))
        .await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::UnclassifiedOutcome));
}

#[tokio::test]
async fn test_success_without_output_is_unclassified() {
    let harness = TestHarness::new();
    harness
        .executor
        .set_response(MockResponse::Report(ExecutionReport::status(200)))
        .await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::UnclassifiedOutcome));
}

#[tokio::test]
async fn test_executor_panic_fails_job() {
    let harness = TestHarness::new();
    harness.executor.set_response(MockResponse::Panic).await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionFailure));
}

#[tokio::test]
async fn test_executor_error_fails_job() {
    let harness = TestHarness::new();
    harness
        .executor
        .set_response(MockResponse::Error("ffmpeg vanished".to_string()))
        .await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionFailure));
    assert!(job
        .failure_reason()
        .is_some_and(|reason| reason.contains("ffmpeg vanished")));
}

// =============================================================================
// Time budget
// =============================================================================

#[tokio::test]
async fn test_timeout_fails_job_and_discards_late_result() {
    let harness = TestHarness::with_timeout(Duration::from_millis(100));
    harness.executor.set_delay(Duration::from_millis(400)).await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionTimeout));
    assert_eq!(harness.executor.completed_count(), 0);

    // Failed within the budget plus a small grace, not when the executor returns
    let ran_for = (job.finished_at.unwrap() - job.started_at.unwrap())
        .to_std()
        .unwrap();
    assert!(ran_for >= Duration::from_millis(100), "ran for {:?}", ran_for);
    assert!(ran_for <= Duration::from_millis(350), "ran for {:?}", ran_for);

    // Let the abandoned execution finish and its result be rejected.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while metrics::LATE_RESULTS_DISCARDED.get() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(harness.executor.completed_count(), 1);
    assert!(metrics::LATE_RESULTS_DISCARDED.get() >= 1);

    let after = harness.store.get(&job_id).unwrap().unwrap();
    assert_eq!(after.state, JobState::Failed);
    assert_eq!(after.result, job.result);
    assert_eq!(after.finished_at, job.finished_at);
    assert_eq!(harness.notifier.for_job(&job_id).await.len(), 1);
}

#[tokio::test]
async fn test_executor_reported_timeout_is_timeout() {
    let harness = TestHarness::new();
    harness.executor.set_response(MockResponse::Timeout).await;

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionTimeout));
}

#[tokio::test]
async fn test_budget_is_passed_to_executor() {
    let harness = TestHarness::with_timeout(Duration::from_secs(7));

    let job_id = harness.submit("clip-1").await;
    harness.wait_for_terminal(&job_id).await;

    let executions = harness.executor.recorded_executions().await;
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].job_id, job_id);
    assert_eq!(executions[0].budget.memory_mb, 512);
    assert_eq!(executions[0].budget.timeout, Duration::from_secs(7));
    assert_eq!(executions[0].input, fixtures::job_input("clip-1"));
}

// =============================================================================
// Idempotence and notification
// =============================================================================

#[tokio::test]
async fn test_concurrent_advance_executes_once() {
    let harness = TestHarness::new();
    harness.executor.set_delay(Duration::from_millis(50)).await;
    let job_id = harness.create_job("clip-1");

    let (first, second) = tokio::join!(
        harness.orchestrator.advance(&job_id),
        harness.orchestrator.advance(&job_id),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    let job = harness.store.get(&job_id).unwrap().unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert_eq!(harness.executor.execution_count().await, 1);
    assert_eq!(harness.notifier.for_job(&job_id).await.len(), 1);
}

#[tokio::test]
async fn test_advance_terminal_job_is_noop() {
    let harness = TestHarness::new();
    let job_id = harness.create_job("clip-1");

    let state = harness.orchestrator.advance(&job_id).await.unwrap();
    assert_eq!(state, JobState::Succeeded);

    let state = harness.orchestrator.advance(&job_id).await.unwrap();
    assert_eq!(state, JobState::Succeeded);
    assert_eq!(harness.executor.execution_count().await, 1);
    assert_eq!(harness.notifier.count().await, 1);
}

#[tokio::test]
async fn test_advance_unknown_job() {
    let harness = TestHarness::new();

    let result = harness.orchestrator.advance("no-such-job").await;
    assert!(matches!(result, Err(OrchestratorError::JobNotFound(id)) if id == "no-such-job"));
}

#[tokio::test]
async fn test_notification_describes_outcome() {
    let harness = TestHarness::new();

    let job_id = harness.submit("clip-1").await;
    harness.wait_for_terminal(&job_id).await;
    assert!(harness.notifier.wait_for(1, Duration::from_secs(2)).await);

    let notifications = harness.notifier.notifications().await;
    assert_eq!(notifications.len(), 1);
    let notification = &notifications[0];
    assert_eq!(notification.job_id, job_id);
    assert_eq!(notification.state, JobState::Succeeded);
    assert_eq!(notification.video_id, "clip-1");
    assert_eq!(notification.submitted_by, "user");
    assert!(notification.output.is_some());
    assert!(notification.failure.is_none());
}

#[tokio::test]
async fn test_failed_notification_does_not_change_outcome() {
    let harness = TestHarness::new();
    harness.notifier.set_failing(true);

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;
    assert!(harness.notifier.wait_for(1, Duration::from_secs(2)).await);

    assert_eq!(job.state, JobState::Succeeded);
    let after = harness.store.get(&job_id).unwrap().unwrap();
    assert_eq!(after.state, JobState::Succeeded);
}

// =============================================================================
// Recovery
// =============================================================================

#[tokio::test]
async fn test_recover_fails_interrupted_and_resumes_submitted() {
    let harness = TestHarness::new();

    let interrupted = harness.create_job("clip-1");
    harness
        .store
        .compare_and_set(&interrupted, JobState::Submitted, JobUpdate::start())
        .unwrap();
    let pending = harness.create_job("clip-2");

    let report = harness.orchestrator.recover().await.unwrap();
    assert_eq!(report.interrupted, vec![interrupted.clone()]);
    assert_eq!(report.resumed, vec![pending.clone()]);

    let job = harness.store.get(&interrupted).unwrap().unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(cause_of(&job), Some(FailureCause::ExecutionFailure));

    let job = harness.wait_for_terminal(&pending).await;
    assert_eq!(job.state, JobState::Succeeded);
    assert!(harness.notifier.wait_for(2, Duration::from_secs(2)).await);
    assert_eq!(harness.notifier.count().await, 2);
}

#[tokio::test]
async fn test_terminal_results_never_change() {
    let harness = TestHarness::new();

    let job_id = harness.submit("clip-1").await;
    let job = harness.wait_for_terminal(&job_id).await;

    let late = JobResult::failed(FailureCause::ExecutionFailure, Some(500), "late");
    let outcome = harness
        .store
        .compare_and_set(&job_id, JobState::Running, JobUpdate::finish(late))
        .unwrap();
    assert!(!outcome.is_applied());

    let after = harness.store.get(&job_id).unwrap().unwrap();
    assert_eq!(after.result, job.result);
    assert_eq!(
        harness
            .store
            .count(&JobFilter::new().with_state(JobState::Succeeded))
            .unwrap(),
        1
    );
}
