//! Types for the executor module.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::job::OutputRef;

/// Resource ceiling for a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionBudget {
    pub memory_mb: u64,
    pub timeout: Duration,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self {
            memory_mb: 3008,
            timeout: Duration::from_secs(600),
        }
    }
}

impl ExecutionBudget {
    pub fn memory_bytes(&self) -> u64 {
        self.memory_mb.saturating_mul(1024 * 1024)
    }
}

/// What the executor reports back.
///
/// `status_code` follows HTTP conventions: 200 is success, anything above
/// is a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ExecutionReport {
    pub fn success(output: OutputRef) -> Self {
        Self {
            status_code: 200,
            output: Some(output),
            error_detail: None,
        }
    }

    pub fn failure(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            output: None,
            error_detail: Some(detail.into()),
        }
    }

    /// A bare status with neither output nor detail.
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            output: None,
            error_detail: None,
        }
    }
}
