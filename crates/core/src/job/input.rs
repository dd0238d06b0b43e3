//! Transcoding payload carried by a job.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key used when `input_files` is a single location.
pub const SINGLE_INPUT_KEY: &str = "input_files";

/// Key used when `output_files` is a single file name.
pub const SINGLE_OUTPUT_KEY: &str = "output_files";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder regex is valid"));

/// Rejection of a submit payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid video_id: {0}")]
    InvalidVideoId(String),

    #[error("Invalid input location for '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Invalid output file name for '{name}': {reason}")]
    InvalidOutput { name: String, reason: String },

    #[error("Unknown placeholder in ffmpeg_command: {{{{{0}}}}}")]
    UnknownPlaceholder(String),
}

/// Either one value or a named set of values.
///
/// Submit payloads may pass `"output_files": "out.mp4"` or
/// `"output_files": {"hd": "hd.mp4", "sd": "sd.mp4"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSet {
    Single(String),
    Named(BTreeMap<String, String>),
}

impl FileSet {
    /// Entries as `(name, value)`, with a single value keyed by `single_key`.
    pub fn entries(&self, single_key: &str) -> Vec<(String, String)> {
        match self {
            FileSet::Single(value) => vec![(single_key.to_string(), value.clone())],
            FileSet::Named(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FileSet::Single(value) => value.trim().is_empty(),
            FileSet::Named(map) => map.is_empty(),
        }
    }
}

/// Where an input file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLocation<'a> {
    /// `http://` or `https://` URL, downloaded before running.
    Remote(&'a str),
    /// Key in the durable sink (`sink://<key>`).
    Sink(&'a str),
    /// Path on the worker's filesystem.
    Local(&'a str),
}

impl<'a> InputLocation<'a> {
    pub fn parse(location: &'a str) -> Self {
        if let Some(key) = location.strip_prefix("sink://") {
            InputLocation::Sink(key)
        } else if location.starts_with("http://") || location.starts_with("https://") {
            InputLocation::Remote(location)
        } else {
            InputLocation::Local(location)
        }
    }
}

/// The transcoding request: inputs, outputs and the ffmpeg arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub video_id: String,
    pub input_files: FileSet,
    pub output_files: FileSet,
    pub ffmpeg_command: String,
}

impl JobInput {
    /// Parse and validate a raw submit payload.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, ValidationError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| ValidationError::Malformed("payload must be a JSON object".into()))?;

        for field in ["video_id", "input_files", "output_files", "ffmpeg_command"] {
            if obj.get(field).is_none_or(|v| v.is_null()) {
                return Err(ValidationError::MissingField(field));
            }
        }

        let input: JobInput = serde_json::from_value(payload.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_plain_name(&self.video_id) {
            return Err(ValidationError::InvalidVideoId(self.video_id.clone()));
        }

        if self.input_files.is_empty() {
            return Err(ValidationError::MissingField("input_files"));
        }
        for (name, location) in self.inputs() {
            validate_location(&name, &location)?;
        }

        if self.output_files.is_empty() {
            return Err(ValidationError::MissingField("output_files"));
        }
        for (name, file) in self.outputs() {
            if !is_plain_name(&file) {
                return Err(ValidationError::InvalidOutput {
                    name,
                    reason: format!("'{}' is not a plain file name", file),
                });
            }
        }

        if self.ffmpeg_command.trim().is_empty() {
            return Err(ValidationError::MissingField("ffmpeg_command"));
        }

        let known: BTreeSet<String> = self.outputs().into_iter().map(|(name, _)| name).collect();
        for name in placeholders(&self.ffmpeg_command) {
            if name != SINGLE_INPUT_KEY && !known.contains(&name) {
                return Err(ValidationError::UnknownPlaceholder(name));
            }
        }

        Ok(())
    }

    /// Input entries as `(name, location)`.
    pub fn inputs(&self) -> Vec<(String, String)> {
        self.input_files.entries(SINGLE_INPUT_KEY)
    }

    /// Output entries as `(name, file name)`.
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.output_files.entries(SINGLE_OUTPUT_KEY)
    }
}

/// Substitute `{{name}}` placeholders in `text` and drop `{{input_files}}`.
///
/// `resolve` maps an output name to the string put in its place; unknown
/// names are left untouched.
pub fn render_placeholders<F>(text: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(text, |caps: &regex_lite::Captures<'_>| {
            let name = &caps[1];
            if name == SINGLE_INPUT_KEY {
                return String::new();
            }
            resolve(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Placeholder names referenced by an ffmpeg command.
pub fn placeholders(command: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(command)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// A single path segment of `[A-Za-z0-9._-]`, not `.` or `..`.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn validate_location(name: &str, location: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidInput {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if location.trim().is_empty() {
        return Err(invalid("location is empty"));
    }

    match InputLocation::parse(location) {
        InputLocation::Remote(url) => {
            let rest = url.split_once("://").map(|(_, r)| r).unwrap_or_default();
            if rest.is_empty() || rest.starts_with('/') {
                return Err(invalid("URL has no host"));
            }
        }
        InputLocation::Sink(key) => {
            if crate::sink::validate_key(key).is_err() {
                return Err(invalid("sink key is not valid"));
            }
        }
        InputLocation::Local(_) => {}
    }

    Ok(())
}
