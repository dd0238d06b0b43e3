//! Second pipeline stage: re-transcode the outputs of finished jobs.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{CompletionNotification, SecondStageConfig};
use crate::admission::{AdmissionGateway, JobHandle};
use crate::job::{FileSet, JobFilter, JobInput, JobState, JobStoreError};
use crate::metrics;

/// Turns each output of a succeeded first-stage job into a chained job.
///
/// Fed by a [`super::ChannelNotifier`]. Chained jobs carry a `parent_id` and
/// are never chained again. A job that already has children in the store is
/// not chained a second time.
pub struct StageChainer {
    gateway: Arc<AdmissionGateway>,
    config: SecondStageConfig,
}

/// Page size used when scanning the store for unchained jobs.
const BACKFILL_PAGE: i64 = 500;

impl StageChainer {
    pub fn new(gateway: Arc<AdmissionGateway>, config: SecondStageConfig) -> Self {
        Self { gateway, config }
    }

    /// Consume notifications until the channel closes.
    ///
    /// This should be spawned as a background task. Succeeded first-stage
    /// jobs that finished while no chainer was running are picked up first.
    pub async fn run(self, mut rx: mpsc::Receiver<CompletionNotification>) {
        info!("Second stage chainer started");

        match self.backfill() {
            Ok(0) => {}
            Ok(admitted) => info!(admitted, "Chained jobs admitted for earlier results"),
            Err(e) => error!(error = %e, "Failed to scan for unchained jobs"),
        }

        while let Some(notification) = rx.recv().await {
            self.handle(&notification);
        }

        info!("Second stage chainer shutting down");
    }

    /// Chained inputs for a notification, without admitting them.
    pub fn plan(&self, notification: &CompletionNotification) -> Vec<JobInput> {
        if notification.state != JobState::Succeeded || notification.parent_id.is_some() {
            return Vec::new();
        }
        let Some(output) = &notification.output else {
            return Vec::new();
        };

        output
            .files
            .values()
            .filter_map(|stored| {
                let file_name = stored.key.rsplit('/').next()?;
                Some(JobInput {
                    video_id: notification.video_id.clone(),
                    input_files: FileSet::Single(format!("sink://{}", stored.key)),
                    output_files: FileSet::Single(format!(
                        "{}.{}",
                        file_name, self.config.output_extension
                    )),
                    ffmpeg_command: self.config.ffmpeg_command.clone(),
                })
            })
            .collect()
    }

    /// Chain every succeeded first-stage job that has no children yet.
    /// Returns the number of chained jobs admitted.
    pub fn backfill(&self) -> Result<usize, JobStoreError> {
        let store = self.gateway.orchestrator().store();
        let mut admitted = 0;
        let mut offset = 0;

        loop {
            let page = store.list(
                &JobFilter::new()
                    .with_state(JobState::Succeeded)
                    .with_limit(BACKFILL_PAGE)
                    .with_offset(offset),
            )?;
            let fetched = page.len() as i64;

            for job in page.iter().filter(|job| job.parent_id.is_none()) {
                if let Some(notification) = CompletionNotification::from_job(job) {
                    admitted += self.handle(&notification).len();
                }
            }

            // Succeeded is terminal: new rows only push older ones to later pages
            if fetched < BACKFILL_PAGE {
                return Ok(admitted);
            }
            offset += fetched;
        }
    }

    /// Whether chained jobs already exist for `job_id`.
    fn already_chained(&self, job_id: &str) -> Result<bool, JobStoreError> {
        let children = self
            .gateway
            .orchestrator()
            .store()
            .count(&JobFilter::new().with_parent_id(job_id))?;
        Ok(children > 0)
    }

    /// Admit the chained jobs for one notification. Notifications for a job
    /// that already has chained jobs are ignored.
    pub fn handle(&self, notification: &CompletionNotification) -> Vec<JobHandle> {
        let planned = self.plan(notification);
        if planned.is_empty() {
            return Vec::new();
        }

        match self.already_chained(&notification.job_id) {
            Ok(false) => {}
            Ok(true) => return Vec::new(),
            Err(e) => {
                error!(parent_id = %notification.job_id, error = %e, "Failed to check for chained jobs");
                return Vec::new();
            }
        }

        let mut admitted = Vec::new();
        for input in planned {
            match self.gateway.admit_chained(input, &notification.job_id) {
                Ok(handle) => {
                    metrics::CHAINED_JOBS.with_label_values(&["admitted"]).inc();
                    info!(parent_id = %notification.job_id, job_id = %handle.id, "Chained job admitted");
                    admitted.push(handle);
                }
                Err(e) => {
                    metrics::CHAINED_JOBS.with_label_values(&["rejected"]).inc();
                    warn!(parent_id = %notification.job_id, error = %e, "Chained job rejected");
                }
            }
        }
        admitted
    }
}
