//! Configuration for the durable sink.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the filesystem-backed sink and its public read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Directory objects are stored under.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Base URL objects are served from (CDN or the server's `/media` route).
    #[serde(default = "default_cdn_base_url")]
    pub cdn_base_url: String,

    /// First key segment for job outputs: `<key_prefix>/<video_id>/<file>`.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_cdn_base_url() -> String {
    "http://localhost:8080/media".to_string()
}

fn default_key_prefix() -> String {
    "ffmpeg".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            cdn_base_url: default_cdn_base_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl SinkConfig {
    /// Key of an output file for a video.
    pub fn output_key(&self, video_id: &str, file_name: &str) -> String {
        format!("{}/{}/{}", self.key_prefix, video_id, file_name)
    }

    /// Key prefix (folder) holding a video's outputs.
    pub fn output_folder(&self, video_id: &str) -> String {
        format!("{}/{}", self.key_prefix, video_id)
    }
}
