//! FFmpeg-based executor implementation.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::args::split_args;
use super::config::ExecutorConfig;
use super::error::ExecutorError;
use super::traits::Executor;
use super::types::{ExecutionBudget, ExecutionReport};
use crate::job::{is_plain_name, render_placeholders, InputLocation, JobInput, OutputRef};
use crate::sink::{DurableSink, SinkError};

/// Lines of ffmpeg stderr kept for failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// Outcome of a single ffmpeg process.
struct FfmpegRun {
    status: ExitStatus,
    stderr_tail: String,
}

/// Either the staged value or a report to return as-is.
enum Staged<T> {
    Ready(T),
    Rejected(ExecutionReport),
}

/// Executor running the job's ffmpeg command on the local machine.
///
/// For each job it stages the inputs into a scratch directory, optionally
/// remuxes the first input into `source.mp4`, runs the command against it and
/// uploads the declared outputs to the sink under
/// `<key_prefix>/<video_id>/<file name>`.
pub struct FfmpegExecutor {
    config: ExecutorConfig,
    sink: Arc<dyn DurableSink>,
    key_prefix: String,
    http: reqwest::Client,
}

impl FfmpegExecutor {
    pub fn new(config: ExecutorConfig, sink: Arc<dyn DurableSink>, key_prefix: String) -> Self {
        Self {
            config,
            sink,
            key_prefix,
            http: reqwest::Client::new(),
        }
    }

    fn remaining(deadline: Instant, budget: &ExecutionBudget) -> Result<Duration, ExecutorError> {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            Err(ExecutorError::Timeout {
                timeout_secs: budget.timeout.as_secs(),
            })
        } else {
            Ok(left)
        }
    }

    /// Local file name for the `index`-th input.
    fn staged_name(index: usize, name: &str, location: &str) -> String {
        let base = location
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|base| is_plain_name(base))
            .unwrap_or(name);
        format!("{}-{}", index, base)
    }

    async fn stage_inputs(
        &self,
        input: &JobInput,
        dir: &Path,
        deadline: Instant,
        budget: &ExecutionBudget,
    ) -> Result<Staged<Vec<PathBuf>>, ExecutorError> {
        tokio::fs::create_dir_all(dir).await?;

        let mut staged = Vec::new();
        for (index, (name, location)) in input.inputs().into_iter().enumerate() {
            let path = match InputLocation::parse(&location) {
                InputLocation::Local(path) => {
                    let path = PathBuf::from(path);
                    if !tokio::fs::try_exists(&path).await? {
                        return Ok(Staged::Rejected(ExecutionReport::failure(
                            400,
                            format!("input '{}' not found: {}", name, location),
                        )));
                    }
                    path
                }
                InputLocation::Sink(key) => {
                    let dest = dir.join(Self::staged_name(index, &name, key));
                    match self.sink.fetch(key, &dest).await {
                        Ok(_) => dest,
                        Err(SinkError::NotFound(_)) | Err(SinkError::InvalidKey(_)) => {
                            return Ok(Staged::Rejected(ExecutionReport::failure(
                                400,
                                format!("input '{}' not found in sink: {}", name, key),
                            )));
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                InputLocation::Remote(url) => {
                    let dest = dir.join(Self::staged_name(index, &name, url));
                    let left = Self::remaining(deadline, budget)?;
                    match timeout(left, self.download(&name, url, &dest)).await {
                        Ok(Ok(Staged::Ready(()))) => dest,
                        Ok(Ok(Staged::Rejected(report))) => return Ok(Staged::Rejected(report)),
                        Ok(Err(e)) => return Err(e),
                        Err(_) => {
                            return Err(ExecutorError::Timeout {
                                timeout_secs: budget.timeout.as_secs(),
                            })
                        }
                    }
                }
            };
            debug!(input = %name, path = %path.display(), "Staged input");
            staged.push(path);
        }

        Ok(Staged::Ready(staged))
    }

    async fn download(
        &self,
        name: &str,
        url: &str,
        dest: &Path,
    ) -> Result<Staged<()>, ExecutorError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ExecutorError::staging(name, e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Staged::Rejected(ExecutionReport::failure(
                400,
                format!(
                    "input '{}' could not be downloaded: HTTP {}",
                    name,
                    response.status()
                ),
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ExecutorError::staging(name, e.to_string()))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(Staged::Ready(()))
    }

    fn command(&self, args: &[String], budget: &ExecutionBudget) -> Command {
        let mut command = if self.config.enforce_memory_limit {
            let mut c = Command::new(&self.config.prlimit_path);
            c.arg(format!("--as={}", budget.memory_bytes()))
                .arg(&self.config.ffmpeg_path);
            c
        } else {
            Command::new(&self.config.ffmpeg_path)
        };

        command
            .args(["-hide_banner", "-nostdin", "-y"])
            .args(["-loglevel", self.config.ffmpeg_log_level.as_str()])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Run ffmpeg with `args`, bounded by what is left of the budget.
    async fn run_ffmpeg(
        &self,
        args: &[String],
        deadline: Instant,
        budget: &ExecutionBudget,
    ) -> Result<FfmpegRun, ExecutorError> {
        let left = Self::remaining(deadline, budget)?;

        debug!(args = ?args, "Running ffmpeg");

        let mut child = self.command(args, budget).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecutorError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                }
            } else {
                ExecutorError::Io(e)
            }
        })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("ffmpeg stderr was not captured"))?;
        let mut reader = BufReader::new(stderr);

        let result = timeout(left, async {
            // Drain to EOF as bytes; ffmpeg stderr is not always UTF-8 and
            // a stalled pipe would block the child.
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, tail))
        })
        .await;

        match result {
            Ok(Ok((status, tail))) => Ok(FfmpegRun {
                status,
                stderr_tail: Vec::from(tail).join("\n"),
            }),
            Ok(Err(e)) => Err(ExecutorError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                Err(ExecutorError::Timeout {
                    timeout_secs: budget.timeout.as_secs(),
                })
            }
        }
    }

    fn failed_run(stage: &str, run: &FfmpegRun) -> ExecutionReport {
        let code = run
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let mut detail = format!("ffmpeg {} exited with {}", stage, code);
        if !run.stderr_tail.is_empty() {
            detail.push_str(": ");
            detail.push_str(&run.stderr_tail);
        }
        ExecutionReport::failure(500, detail)
    }

    async fn run_job(
        &self,
        job_id: &str,
        input: &JobInput,
        budget: &ExecutionBudget,
        work: &Path,
        deadline: Instant,
    ) -> Result<ExecutionReport, ExecutorError> {
        let inputs = match self
            .stage_inputs(input, &work.join("in"), deadline, budget)
            .await?
        {
            Staged::Ready(inputs) => inputs,
            Staged::Rejected(report) => return Ok(report),
        };
        let Some(first) = inputs.first() else {
            return Ok(ExecutionReport::failure(400, "no input files"));
        };

        let source = if self.config.remux_source {
            let source = work.join("source.mp4");
            let args = vec![
                "-i".to_string(),
                first.to_string_lossy().to_string(),
                "-c".to_string(),
                "copy".to_string(),
                source.to_string_lossy().to_string(),
            ];
            let run = self.run_ffmpeg(&args, deadline, budget).await?;
            if !run.status.success() {
                return Ok(Self::failed_run("remux", &run));
            }
            source
        } else {
            first.clone()
        };

        let out_dir = work.join("out");
        tokio::fs::create_dir_all(&out_dir).await?;

        let outputs: BTreeMap<String, String> = input.outputs().into_iter().collect();
        let resolve = |name: &str| {
            outputs
                .get(name)
                .map(|file| out_dir.join(file).to_string_lossy().to_string())
        };

        let mut args = vec!["-i".to_string(), source.to_string_lossy().to_string()];
        for token in split_args(&input.ffmpeg_command)? {
            let rendered = render_placeholders(&token, resolve);
            if rendered.is_empty() && !token.is_empty() {
                continue;
            }
            args.push(rendered);
        }

        let run = self.run_ffmpeg(&args, deadline, budget).await?;
        if !run.status.success() {
            return Ok(Self::failed_run("transcode", &run));
        }

        let mut files = BTreeMap::new();
        for (name, file) in &outputs {
            let local = out_dir.join(file);
            if !tokio::fs::try_exists(&local).await? {
                warn!(job_id = %job_id, output = %name, file = %file, "Declared output was not produced");
                continue;
            }
            let key = format!("{}/{}/{}", self.key_prefix, input.video_id, file);
            let stored = self.sink.put(&local, &key).await?;
            files.insert(name.clone(), stored);
        }

        if files.is_empty() {
            return Ok(ExecutionReport::failure(
                500,
                "ffmpeg finished but produced none of the declared outputs",
            ));
        }

        let folder = format!("{}/{}", self.key_prefix, input.video_id);
        Ok(ExecutionReport::success(OutputRef {
            location: self.sink.folder_url(&folder),
            files,
        }))
    }
}

#[async_trait]
impl Executor for FfmpegExecutor {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn execute(
        &self,
        job_id: &str,
        input: &JobInput,
        budget: &ExecutionBudget,
    ) -> Result<ExecutionReport, ExecutorError> {
        let deadline = Instant::now() + budget.timeout;
        let work = self.config.work_dir.join(job_id);
        tokio::fs::create_dir_all(&work).await?;

        info!(
            job_id = %job_id,
            video_id = %input.video_id,
            memory_mb = budget.memory_mb,
            timeout_secs = budget.timeout.as_secs(),
            "Executing job"
        );

        let result = self.run_job(job_id, input, budget, &work, deadline).await;

        if !self.config.keep_work_dir {
            if let Err(e) = tokio::fs::remove_dir_all(&work).await {
                warn!(job_id = %job_id, error = %e, "Failed to remove work directory");
            }
        }

        result
    }

    async fn validate(&self) -> Result<(), ExecutorError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecutorError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ExecutorError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ExecutorError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            });
        }
        Ok(())
    }
}
