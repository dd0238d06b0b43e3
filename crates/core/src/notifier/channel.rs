//! In-process notifier backed by a bounded channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CompletionNotification, CompletionNotifier, NotifierError};

/// Forwards notifications into a bounded mpsc channel.
///
/// A full channel makes `notify` wait for room; nothing is dropped while the
/// receiver is alive.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<CompletionNotification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<CompletionNotification>) -> Self {
        Self { tx }
    }

    /// Create a notifier together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CompletionNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl CompletionNotifier for ChannelNotifier {
    fn name(&self) -> &str {
        "channel"
    }

    async fn notify(&self, notification: &CompletionNotification) -> Result<(), NotifierError> {
        self.tx
            .send(notification.clone())
            .await
            .map_err(|_| NotifierError::ChannelClosed)
    }
}
