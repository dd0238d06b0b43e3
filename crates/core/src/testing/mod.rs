//! Testing utilities and mock implementations.
//!
//! Mock implementations of the executor, Authorizer, notifier and sink
//! seams, so the whole pipeline can be driven without ffmpeg or a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use transflow_core::testing::{MockAuthenticator, MockExecutor, RecordingNotifier};
//!
//! let executor = MockExecutor::new();
//! let auth = MockAuthenticator::new("secret");
//! let notifier = RecordingNotifier::new();
//!
//! // Script the executor
//! executor.set_delay(Duration::from_secs(5)).await;
//!
//! // Wire into JobOrchestrator / AdmissionGateway...
//! ```

mod memory_sink;
mod mock_authenticator;
mod mock_executor;
mod recording_notifier;

pub use memory_sink::MemorySink;
pub use mock_authenticator::MockAuthenticator;
pub use mock_executor::{MockExecutor, MockResponse, RecordedExecution};
pub use recording_notifier::RecordingNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde_json::{json, Value};

    use crate::job::{FileSet, Job, JobInput, JobStore};

    /// A single-input, single-output transcode job.
    pub fn job_input(video_id: &str) -> JobInput {
        JobInput {
            video_id: video_id.to_string(),
            input_files: FileSet::Single("https://example.com/source.mov".to_string()),
            output_files: FileSet::Single("out.mp4".to_string()),
            ffmpeg_command: "-i {{input_files}} -c:v libx264 {{output_files}}".to_string(),
        }
    }

    /// A job with named inputs and outputs.
    pub fn named_job_input(video_id: &str) -> JobInput {
        let inputs = BTreeMap::from([
            ("video".to_string(), "https://example.com/video.mov".to_string()),
            ("audio".to_string(), "https://example.com/audio.wav".to_string()),
        ]);
        let outputs = BTreeMap::from([
            ("hd".to_string(), "hd.mp4".to_string()),
            ("thumb".to_string(), "thumb.jpg".to_string()),
        ]);
        JobInput {
            video_id: video_id.to_string(),
            input_files: FileSet::Named(inputs),
            output_files: FileSet::Named(outputs),
            ffmpeg_command: "-i {{input_files}} -map 0:v {{hd}} -frames:v 1 {{thumb}}"
                .to_string(),
        }
    }

    /// The wire payload for [`job_input`].
    pub fn job_payload(video_id: &str) -> Value {
        json!({
            "video_id": video_id,
            "input_files": "https://example.com/source.mov",
            "output_files": "out.mp4",
            "ffmpeg_command": "-i {{input_files}} -c:v libx264 {{output_files}}",
        })
    }

    /// Poll the store until the job is terminal or `timeout` passes.
    pub async fn wait_for_terminal(
        store: &dyn JobStore,
        job_id: &str,
        timeout: Duration,
    ) -> Option<Job> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(Some(job)) = store.get(job_id) {
                if job.state.is_terminal() {
                    return Some(job);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
