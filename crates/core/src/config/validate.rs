use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Pipeline command is not blank
/// - Job event buffer can hold at least one event
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.pipeline.command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "pipeline.command cannot be empty".to_string(),
        ));
    }

    if config.jobs.event_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.event_buffer must be at least 1".to_string(),
        ));
    }

    Ok(())
}
