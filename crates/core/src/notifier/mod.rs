//! Completion notifications and the second pipeline stage.
//!
//! The orchestrator hands every terminal transition to one
//! [`CompletionNotifier`]. Delivery is best effort: failures are logged and
//! counted, never reflected in job state.

mod chain;
mod channel;
mod config;
mod fanout;
mod traits;
mod types;
mod webhook;

pub use chain::StageChainer;
pub use channel::ChannelNotifier;
pub use config::{NotifierConfig, SecondStageConfig};
pub use fanout::FanoutNotifier;
pub use traits::{CompletionNotifier, NotifierError};
pub use types::CompletionNotification;
pub use webhook::WebhookNotifier;
