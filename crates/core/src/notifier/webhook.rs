//! HTTP webhook notifier.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{CompletionNotification, CompletionNotifier, NotifierError};

/// POSTs each notification as JSON to a fixed URL.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Delivery(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl CompletionNotifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, notification: &CompletionNotification) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifierError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(job_id = %notification.job_id, url = %self.url, "Webhook delivered");
        Ok(())
    }
}
