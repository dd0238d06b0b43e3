pub mod admission;
pub mod auth;
pub mod config;
pub mod executor;
pub mod job;
pub mod metrics;
pub mod notifier;
pub mod orchestrator;
pub mod sink;
pub mod testing;

pub use admission::{AdmissionError, AdmissionGateway, JobHandle, SubmitRequest};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, DatabaseConfig, SanitizedConfig, ServerConfig,
};
pub use executor::{
    ExecutionBudget, ExecutionReport, Executor, ExecutorConfig, ExecutorError, FfmpegExecutor,
};
pub use job::{
    CasOutcome, CreateJobRequest, FailureCause, Job, JobFilter, JobInput, JobResult, JobState,
    JobStore, JobStoreError, JobUpdate, OutputRef, SqliteJobStore, StoredObject, ValidationError,
};
pub use notifier::{
    ChannelNotifier, CompletionNotification, CompletionNotifier, FanoutNotifier, NotifierConfig,
    NotifierError, SecondStageConfig, StageChainer, WebhookNotifier,
};
pub use orchestrator::{JobOrchestrator, OrchestratorError, RecoveryReport};
pub use sink::{DurableSink, FsSink, SinkConfig, SinkError};
