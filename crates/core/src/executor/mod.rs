//! Worker executor: runs a job's transformation within a resource budget.
//!
//! The executor is the only place where job payloads are touched. It reports
//! an HTTP-style status code; classifying that status into a job outcome is
//! the orchestrator's job.
//!
//! # Example
//!
//! ```ignore
//! use transflow_core::executor::{Executor, ExecutorConfig, FfmpegExecutor};
//!
//! let config = ExecutorConfig::default();
//! let executor = FfmpegExecutor::new(config.clone(), sink, "ffmpeg".to_string());
//! executor.validate().await?;
//!
//! let report = executor.execute(&job.id, &job.input, &config.budget()).await?;
//! println!("status {}", report.status_code);
//! ```

mod args;
mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use args::split_args;
pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use ffmpeg::FfmpegExecutor;
pub use traits::Executor;
pub use types::{ExecutionBudget, ExecutionReport};
