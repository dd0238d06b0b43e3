//! Configuration for completion notifications and the second pipeline stage.

use serde::{Deserialize, Serialize};

/// Where completion notifications go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// POST every notification to this URL as JSON.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Timeout for a single webhook delivery, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Buffer size of the in-process notification channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Second transcode stage, triggered by the outputs of first-stage jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondStageConfig {
    #[serde(default)]
    pub enabled: bool,

    /// FFmpeg arguments for chained jobs; `{{output_files}}` is the output.
    #[serde(default = "default_second_stage_command")]
    pub ffmpeg_command: String,

    /// Extension appended to the parent's file name for the chained output.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

fn default_second_stage_command() -> String {
    concat!(
        r#"-vf "deband=range=16:1thr=0.02:2thr=0.02:3thr=0.02" "#,
        "-c:v libx264 -preset ultrafast -crf 30 -pix_fmt yuv420p -profile:v high ",
        r#"-x264-params "psy-rd=1.0:0.15:aq-mode=3:aq-strength=1.0:ref=4:bframes=3" "#,
        "-s 1280x720 -c:a:0 aac -b:a:0 96k {{output_files}}"
    )
    .to_string()
}

fn default_output_extension() -> String {
    "mp4".to_string()
}

impl Default for SecondStageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ffmpeg_command: default_second_stage_command(),
            output_extension: default_output_extension(),
        }
    }
}
