//! Mock executor for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::executor::{ExecutionBudget, ExecutionReport, Executor, ExecutorError};
use crate::job::{JobInput, OutputRef, StoredObject};

/// What the mock does when executed.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Report 200 with an output reference derived from the job's outputs.
    Success,
    /// Return this report as-is.
    Report(ExecutionReport),
    /// Fail with `ExecutorError::Timeout`.
    Timeout,
    /// Fail with `ExecutorError::Crashed` carrying this message.
    Error(String),
    /// Panic inside the executor task.
    Panic,
}

/// A recorded execution for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    pub job_id: String,
    pub input: JobInput,
    pub budget: ExecutionBudget,
}

/// Mock implementation of the Executor trait.
///
/// Provides controllable behavior for testing:
/// - Track executions for assertions
/// - Script the report, error or panic returned
/// - Delay completion to exercise the time budget
///
/// # Example
///
/// ```rust,ignore
/// use transflow_core::testing::{MockExecutor, MockResponse};
///
/// let executor = MockExecutor::new();
/// executor.set_response(MockResponse::Report(ExecutionReport::failure(500, "boom"))).await;
/// executor.set_delay(Duration::from_millis(50)).await;
/// ```
#[derive(Debug, Clone)]
pub struct MockExecutor {
    executions: Arc<RwLock<Vec<RecordedExecution>>>,
    response: Arc<RwLock<MockResponse>>,
    delay: Arc<RwLock<Duration>>,
    completed: Arc<AtomicUsize>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            executions: Arc::new(RwLock::new(Vec::new())),
            response: Arc::new(RwLock::new(MockResponse::Success)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_response(response: MockResponse) -> Self {
        Self {
            response: Arc::new(RwLock::new(response)),
            ..Self::new()
        }
    }

    pub async fn set_response(&self, response: MockResponse) {
        *self.response.write().await = response;
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    pub async fn recorded_executions(&self) -> Vec<RecordedExecution> {
        self.executions.read().await.clone()
    }

    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    /// Executions that ran to the end (including ones nobody waited for).
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Output reference the mock reports for `input` on success.
    pub fn output_for(input: &JobInput) -> OutputRef {
        let files: BTreeMap<String, StoredObject> = input
            .outputs()
            .into_iter()
            .map(|(name, file)| {
                let key = format!("ffmpeg/{}/{}", input.video_id, file);
                let stored = StoredObject {
                    url: format!("http://mock-cdn/{}", key),
                    key,
                    size_bytes: 1024,
                };
                (name, stored)
            })
            .collect();

        OutputRef {
            location: format!("http://mock-cdn/ffmpeg/{}/", input.video_id),
            files,
        }
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(
        &self,
        job_id: &str,
        input: &JobInput,
        budget: &ExecutionBudget,
    ) -> Result<ExecutionReport, ExecutorError> {
        self.executions.write().await.push(RecordedExecution {
            job_id: job_id.to_string(),
            input: input.clone(),
            budget: *budget,
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.response.read().await.clone();
        self.completed.fetch_add(1, Ordering::SeqCst);

        match response {
            MockResponse::Success => Ok(ExecutionReport::success(Self::output_for(input))),
            MockResponse::Report(report) => Ok(report),
            MockResponse::Timeout => Err(ExecutorError::Timeout {
                timeout_secs: budget.timeout.as_secs(),
            }),
            MockResponse::Error(message) => Err(ExecutorError::Crashed(message)),
            MockResponse::Panic => panic!("mock executor panic"),
        }
    }
}
