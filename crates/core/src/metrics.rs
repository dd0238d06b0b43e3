//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Admission (accepted jobs, rejections by reason)
//! - Orchestrator (terminal outcomes, in-flight jobs, execution time)
//! - Notifier (delivery results)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Admission
// =============================================================================

/// Jobs accepted by the admission gateway, by origin.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transflow_jobs_submitted_total", "Total jobs admitted"),
        &["origin"], // "client", "chained"
    )
    .unwrap()
});

/// Submissions rejected before a job was created.
pub static ADMISSION_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transflow_admission_rejected_total",
            "Total submissions rejected at admission",
        ),
        &["reason"], // "not_authenticated", "invalid_credentials", "unavailable", "validation", "store"
    )
    .unwrap()
});

// =============================================================================
// Orchestrator
// =============================================================================

/// Jobs reaching a terminal state.
pub static JOBS_TERMINAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transflow_jobs_terminal_total",
            "Total jobs reaching a terminal state",
        ),
        &["state", "cause"], // cause is "none" for succeeded jobs
    )
    .unwrap()
});

/// Jobs currently in `running`.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transflow_jobs_in_flight", "Jobs currently executing").unwrap()
});

/// Executor wall time in seconds.
pub static EXECUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "transflow_execution_duration_seconds",
            "Executor wall time per job",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0]),
        &["outcome"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Executor reports that arrived after the job was already terminal.
pub static LATE_RESULTS_DISCARDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "transflow_late_results_discarded_total",
        "Executor results discarded because the job was already terminal",
    )
    .unwrap()
});

// =============================================================================
// Notifier
// =============================================================================

/// Completion notifications by delivery result.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transflow_notifications_total",
            "Total completion notifications",
        ),
        &["result"], // "delivered", "failed"
    )
    .unwrap()
});

/// Jobs created by the second pipeline stage.
pub static CHAINED_JOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transflow_chained_jobs_total",
            "Second-stage jobs triggered by completed jobs",
        ),
        &["result"], // "admitted", "rejected"
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Admission
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(ADMISSION_REJECTED.clone()),
        // Orchestrator
        Box::new(JOBS_TERMINAL.clone()),
        Box::new(JOBS_IN_FLIGHT.clone()),
        Box::new(EXECUTION_DURATION.clone()),
        Box::new(LATE_RESULTS_DISCARDED.clone()),
        // Notifier
        Box::new(NOTIFICATIONS.clone()),
        Box::new(CHAINED_JOBS.clone()),
    ]
}
