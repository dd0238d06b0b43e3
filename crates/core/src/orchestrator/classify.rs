//! Mapping executor outcomes to job results.

use crate::executor::{ExecutionReport, ExecutorError};
use crate::job::{FailureCause, JobResult};

/// Classify whatever the executor produced into a terminal result.
///
/// | Outcome                         | Result                          |
/// |---------------------------------|---------------------------------|
/// | status 200 with output          | `Succeeded`                     |
/// | status 200 without output       | `Failed(UnclassifiedOutcome)`   |
/// | status > 200                    | `Failed(ExecutionFailure)`      |
/// | status < 200                    | `Failed(UnclassifiedOutcome)`   |
/// | `ExecutorError::Timeout`        | `Failed(ExecutionTimeout)`      |
/// | any other error or a crash      | `Failed(ExecutionFailure)`      |
pub fn classify(outcome: Result<ExecutionReport, ExecutorError>) -> JobResult {
    match outcome {
        Ok(report) => classify_report(report),
        Err(e) if e.is_timeout() => {
            JobResult::failed(FailureCause::ExecutionTimeout, None, e.to_string())
        }
        Err(e) => JobResult::failed(FailureCause::ExecutionFailure, None, e.to_string()),
    }
}

pub fn classify_report(report: ExecutionReport) -> JobResult {
    let code = report.status_code;
    let detail = || {
        report
            .error_detail
            .clone()
            .unwrap_or_else(|| format!("executor returned status {}", code))
    };

    match code {
        200 => match report.output {
            Some(output) => JobResult::Succeeded {
                status_code: code,
                output,
            },
            None => JobResult::failed(
                FailureCause::UnclassifiedOutcome,
                Some(code),
                "executor reported success without an output reference",
            ),
        },
        c if c > 200 => JobResult::failed(FailureCause::ExecutionFailure, Some(c), detail()),
        c => JobResult::failed(FailureCause::UnclassifiedOutcome, Some(c), detail()),
    }
}
