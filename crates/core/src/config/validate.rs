use super::{types::Config, AuthMethod, ConfigError};
use crate::sink::validate_key;

/// Validate cross-field rules that serde defaults cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_ref().is_none_or(|k| k.is_empty())
    {
        return Err(invalid("auth.api_key must be set when auth.method = \"api_key\""));
    }

    if config.auth.timeout_ms == 0 {
        return Err(invalid("auth.timeout_ms must be greater than 0"));
    }

    if config.executor.timeout_secs == 0 {
        return Err(invalid("executor.timeout_secs must be greater than 0"));
    }

    if config.executor.memory_limit_mb == 0 {
        return Err(invalid("executor.memory_limit_mb must be greater than 0"));
    }

    if config.sink.cdn_base_url.trim().is_empty() {
        return Err(invalid("sink.cdn_base_url cannot be empty"));
    }

    validate_key(&config.sink.key_prefix)
        .map_err(|e| invalid(&format!("sink.key_prefix: {}", e)))?;

    if config.notifier.channel_capacity == 0 {
        return Err(invalid("notifier.channel_capacity must be greater than 0"));
    }

    if config.second_stage.enabled {
        if config.second_stage.ffmpeg_command.trim().is_empty() {
            return Err(invalid("second_stage.ffmpeg_command cannot be empty"));
        }
        if config.second_stage.output_extension.is_empty()
            || config.second_stage.output_extension.contains(['/', '\\', '.'])
        {
            return Err(invalid(
                "second_stage.output_extension must be a bare extension like \"mp4\"",
            ));
        }
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}
