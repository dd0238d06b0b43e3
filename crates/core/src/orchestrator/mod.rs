//! Job orchestrator: the state machine driving each job to a terminal state.
//!
//! Each admitted job is advanced by its own task:
//! - **Start**: `submitted -> running` via compare-and-set; a lost race is a no-op
//! - **Execute**: the executor runs under a time budget; the only suspension point
//! - **Finish**: `running -> succeeded | failed` via compare-and-set, then one
//!   completion notification

mod classify;
mod runner;
mod types;

pub use classify::{classify, classify_report};
pub use runner::JobOrchestrator;
pub use types::{OrchestratorError, RecoveryReport};
