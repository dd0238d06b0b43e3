//! Notifier that records everything it receives.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::notifier::{CompletionNotification, CompletionNotifier, NotifierError};

/// Records notifications for assertions; can be told to fail delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<RwLock<Vec<CompletionNotification>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (they are still recorded).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn notifications(&self) -> Vec<CompletionNotification> {
        self.notifications.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.notifications.read().await.len()
    }

    /// Notifications received for one job.
    pub async fn for_job(&self, job_id: &str) -> Vec<CompletionNotification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Wait until at least `count` notifications arrived or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count().await >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &CompletionNotification) -> Result<(), NotifierError> {
        self.notifications.write().await.push(notification.clone());

        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifierError::Delivery("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}
