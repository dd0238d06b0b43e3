//! Configuration for the worker executor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::ExecutionBudget;

/// Configuration for the ffmpeg-based executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Directory holding per-job scratch directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Memory ceiling per execution, in megabytes.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// Time ceiling per execution, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Stream-copy the first input into `source.mp4` before transcoding.
    #[serde(default = "default_true")]
    pub remux_source: bool,

    /// Run ffmpeg under `prlimit --as` so the memory ceiling is enforced
    /// locally instead of by the execution environment.
    #[serde(default)]
    pub enforce_memory_limit: bool,

    /// Path to the `prlimit` binary, used with `enforce_memory_limit`.
    #[serde(default = "default_prlimit_path")]
    pub prlimit_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Keep scratch directories after the job finishes (debugging aid).
    #[serde(default)]
    pub keep_work_dir: bool,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("transflow-work")
}

fn default_memory_limit_mb() -> u64 {
    3008
}

fn default_timeout_secs() -> u64 {
    600 // 10 minutes
}

fn default_true() -> bool {
    true
}

fn default_prlimit_path() -> PathBuf {
    PathBuf::from("prlimit")
}

fn default_log_level() -> String {
    "warning".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            work_dir: default_work_dir(),
            memory_limit_mb: default_memory_limit_mb(),
            timeout_secs: default_timeout_secs(),
            remux_source: true,
            enforce_memory_limit: false,
            prlimit_path: default_prlimit_path(),
            ffmpeg_log_level: default_log_level(),
            keep_work_dir: false,
        }
    }
}

impl ExecutorConfig {
    /// Resource ceiling handed to the executor on every invocation.
    pub fn budget(&self) -> ExecutionBudget {
        ExecutionBudget {
            memory_mb: self.memory_limit_mb,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    pub fn with_ffmpeg_path(mut self, ffmpeg_path: PathBuf) -> Self {
        self.ffmpeg_path = ffmpeg_path;
        self
    }
}
