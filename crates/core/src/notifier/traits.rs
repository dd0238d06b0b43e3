//! Trait definitions for the notifier module.

use async_trait::async_trait;
use thiserror::Error;

use super::CompletionNotification;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The receiving endpoint answered with a non-success status.
    #[error("Endpoint rejected notification with status {status}")]
    Rejected { status: u16 },

    #[error("Notification channel is closed")]
    ChannelClosed,

    #[error("{failed} of {total} notifiers failed")]
    Partial { failed: usize, total: usize },
}

/// Receives one notification per terminal transition.
///
/// Delivery is at-least-once from the notifier's side; consumers
/// de-duplicate on `job_id`. Failures never affect job state.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// Returns the name of this notifier implementation.
    fn name(&self) -> &str;

    async fn notify(&self, notification: &CompletionNotification) -> Result<(), NotifierError>;
}
