//! Delivery to several notifiers at once.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use super::{CompletionNotification, CompletionNotifier, NotifierError};

/// Delivers every notification to all of its notifiers.
///
/// One failing notifier does not stop delivery to the others. With no
/// notifiers configured, `notify` is a no-op.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn CompletionNotifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn CompletionNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn push(&mut self, notifier: Arc<dyn CompletionNotifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.notifiers.iter().map(|n| n.name().to_string()).collect()
    }
}

#[async_trait]
impl CompletionNotifier for FanoutNotifier {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn notify(&self, notification: &CompletionNotification) -> Result<(), NotifierError> {
        let results = join_all(self.notifiers.iter().map(|n| n.notify(notification))).await;

        let mut failed = 0;
        for (notifier, result) in self.notifiers.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    job_id = %notification.job_id,
                    notifier = notifier.name(),
                    error = %e,
                    "Notification delivery failed"
                );
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(NotifierError::Partial {
                failed,
                total: self.notifiers.len(),
            });
        }
        Ok(())
    }
}
