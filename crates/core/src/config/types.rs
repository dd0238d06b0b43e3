use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::auth::DEFAULT_TOKEN_HEADER;
use crate::executor::ExecutorConfig;
use crate::notifier::{NotifierConfig, SecondStageConfig};
use crate::sink::SinkConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub second_stage: SecondStageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Expected token (required when method = "api_key").
    #[serde(default)]
    pub api_key: Option<String>,
    /// Extra header carrying the token, checked besides `Authorization`.
    #[serde(default = "default_token_header")]
    pub token_header: String,
    /// Upper bound on a single Authorizer call, in milliseconds.
    #[serde(default = "default_auth_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::None,
            api_key: None,
            token_header: default_token_header(),
            timeout_ms: default_auth_timeout_ms(),
        }
    }
}

fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}

fn default_auth_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::ApiKey => "api_key",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("transflow.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub executor: ExecutorConfig,
    pub sink: SinkConfig,
    pub notifier: SanitizedNotifierConfig,
    pub second_stage: SecondStageConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
    pub token_header: String,
}

/// Notifier config with the webhook URL hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotifierConfig {
    pub webhook_configured: bool,
    pub timeout_secs: u64,
    pub channel_capacity: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                token_header: config.auth.token_header.clone(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            executor: config.executor.clone(),
            sink: config.sink.clone(),
            notifier: SanitizedNotifierConfig {
                webhook_configured: config.notifier.webhook_url.is_some(),
                timeout_secs: config.notifier.timeout_secs,
                channel_capacity: config.notifier.channel_capacity,
            },
            second_stage: config.second_stage.clone(),
        }
    }
}
