//! Second stage chaining integration tests.

use std::sync::Arc;
use std::time::Duration;

use transflow_core::{
    testing::{fixtures, MockAuthenticator, MockExecutor, RecordingNotifier},
    AdmissionGateway, ChannelNotifier, CompletionNotification, CreateJobRequest, ExecutionBudget,
    FanoutNotifier, JobFilter, JobOrchestrator, JobState, JobStore, SecondStageConfig,
    SqliteJobStore, StageChainer,
};
use transflow_core::job::{FileSet, InputLocation};

struct TestHarness {
    store: Arc<SqliteJobStore>,
    recorder: RecordingNotifier,
    gateway: Arc<AdmissionGateway>,
    rx: Option<tokio::sync::mpsc::Receiver<CompletionNotification>>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_capacity(16)
    }

    fn with_capacity(capacity: usize) -> Self {
        let store = Arc::new(SqliteJobStore::in_memory().expect("Failed to create job store"));
        let recorder = RecordingNotifier::new();
        let (channel, rx) = ChannelNotifier::channel(capacity);
        let notifier = FanoutNotifier::new()
            .with(Arc::new(recorder.clone()))
            .with(Arc::new(channel));

        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::new(MockExecutor::new()),
            Arc::new(notifier),
            ExecutionBudget::default(),
        ));
        let gateway = Arc::new(AdmissionGateway::new(
            Arc::new(MockAuthenticator::new("token")),
            orchestrator,
            Duration::from_secs(1),
        ));

        Self {
            store,
            recorder,
            gateway,
            rx: Some(rx),
        }
    }

    fn chainer(&self) -> StageChainer {
        StageChainer::new(Arc::clone(&self.gateway), SecondStageConfig::default())
    }

    fn create_first_stage(&self, input: transflow_core::JobInput) -> String {
        self.store
            .create(CreateJobRequest {
                input,
                submitted_by: "user".to_string(),
                parent_id: None,
            })
            .unwrap()
            .id
    }

    fn children(&self, parent_id: &str) -> i64 {
        self.store
            .count(&JobFilter::new().with_parent_id(parent_id))
            .unwrap()
    }

    async fn run_first_stage(&self, input: transflow_core::JobInput) -> CompletionNotification {
        let id = self.create_first_stage(input);
        self.gateway.orchestrator().advance(&id).await.unwrap();
        let job = self.store.get(&id).unwrap().unwrap();
        CompletionNotification::from_job(&job).expect("job is terminal")
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_plan_chains_each_output_file() {
    let harness = TestHarness::new();
    let notification = harness
        .run_first_stage(fixtures::named_job_input("clip-1"))
        .await;

    let planned = harness.chainer().plan(&notification);
    assert_eq!(planned.len(), 2);

    for input in &planned {
        assert_eq!(input.video_id, "clip-1");
        assert_eq!(input.ffmpeg_command, SecondStageConfig::default().ffmpeg_command);
        assert!(input.validate().is_ok());

        let FileSet::Single(location) = &input.input_files else {
            panic!("chained input should be a single location");
        };
        assert!(matches!(InputLocation::parse(location), InputLocation::Sink(_)));
    }

    let outputs: Vec<String> = planned
        .iter()
        .flat_map(|i| i.outputs().into_iter().map(|(_, file)| file))
        .collect();
    assert!(outputs.contains(&"hd.mp4.mp4".to_string()));
    assert!(outputs.contains(&"thumb.jpg.mp4".to_string()));
}

#[tokio::test]
async fn test_failed_and_chained_jobs_are_not_chained() {
    let harness = TestHarness::new();
    let mut notification = harness.run_first_stage(fixtures::job_input("clip-1")).await;
    let chainer = harness.chainer();

    notification.parent_id = Some("earlier".to_string());
    assert!(chainer.plan(&notification).is_empty());

    notification.parent_id = None;
    notification.state = JobState::Failed;
    assert!(chainer.plan(&notification).is_empty());
}

#[tokio::test]
async fn test_duplicate_notification_is_ignored() {
    let harness = TestHarness::new();
    let notification = harness.run_first_stage(fixtures::job_input("clip-1")).await;
    let chainer = harness.chainer();

    let first = chainer.handle(&notification);
    let second = chainer.handle(&notification);

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert_eq!(harness.children(&notification.job_id), 1);
}

#[tokio::test]
async fn test_duplicate_is_ignored_across_chainer_instances() {
    let harness = TestHarness::new();
    let notification = harness.run_first_stage(fixtures::job_input("clip-1")).await;

    assert_eq!(harness.chainer().handle(&notification).len(), 1);
    // A fresh chainer, as after a restart, still sees the existing child
    assert!(harness.chainer().handle(&notification).is_empty());
    assert_eq!(harness.children(&notification.job_id), 1);
}

#[tokio::test]
async fn test_small_channel_loses_no_second_stage_triggers() {
    let mut harness = TestHarness::with_capacity(1);
    let rx = harness.rx.take().unwrap();

    let parents: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|video| harness.create_first_stage(fixtures::job_input(video)))
        .collect();
    for id in &parents {
        harness.gateway.orchestrator().spawn_advance(id.clone());
    }

    // Let the first stage fill the channel before anything consumes it
    tokio::time::sleep(Duration::from_millis(100)).await;
    let task = tokio::spawn(harness.chainer().run(rx));

    let chained = wait_until(
        || parents.iter().all(|id| harness.children(id) == 1),
        Duration::from_secs(5),
    )
    .await;
    assert!(chained, "every succeeded parent should get one chained job");
    for id in &parents {
        let parent = harness.store.get(id).unwrap().unwrap();
        assert_eq!(parent.state, JobState::Succeeded);
    }

    task.abort();
}

#[tokio::test]
async fn test_chainer_picks_up_results_from_before_it_started() {
    let mut harness = TestHarness::new();
    let rx = harness.rx.take().unwrap();

    let done = harness.run_first_stage(fixtures::job_input("early")).await;
    let failed_id = harness.create_first_stage(fixtures::job_input("never-run"));

    // Notifications sent before start are dropped with the receiver
    drop(rx);
    let (_, rx) = tokio::sync::mpsc::channel(4);
    let task = tokio::spawn(harness.chainer().run(rx));

    assert!(wait_until(|| harness.children(&done.job_id) == 1, Duration::from_secs(3)).await);
    assert_eq!(harness.children(&failed_id), 0);

    // A second scan admits nothing new
    assert_eq!(harness.chainer().backfill().unwrap(), 0);

    task.abort();
}

#[tokio::test]
async fn test_running_chainer_admits_second_stage() {
    let mut harness = TestHarness::new();
    let rx = harness.rx.take().unwrap();
    let chainer = harness.chainer();
    let task = tokio::spawn(chainer.run(rx));

    let notification = harness.run_first_stage(fixtures::job_input("clip-1")).await;

    // First stage notification, then the chained job's own notification.
    assert!(harness.recorder.wait_for(2, Duration::from_secs(3)).await);

    let children = harness
        .store
        .list(&JobFilter::new().with_parent_id(notification.job_id.clone()))
        .unwrap();
    assert_eq!(children.len(), 1);

    let child = fixtures::wait_for_terminal(
        harness.store.as_ref(),
        &children[0].id,
        Duration::from_secs(3),
    )
    .await
    .unwrap();
    assert_eq!(child.state, JobState::Succeeded);
    assert_eq!(child.submitted_by, "pipeline");
    assert_eq!(child.input.outputs()[0].1, "out.mp4.mp4");

    // The chained job is not chained again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.store.count(&JobFilter::new()).unwrap(), 2);

    task.abort();
}
