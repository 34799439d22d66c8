//! Launch store trait and errors.

use thiserror::Error;

use super::types::is_safe_name_fragment;
use super::LaunchConfiguration;

/// Errors from loading or saving a launch configuration.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Nothing was stored for this key.
    #[error("no launch configuration stored for '{0}'")]
    ConfigurationMissing(String),

    /// Something was stored but it does not parse.
    #[error("launch configuration for '{key}' is corrupt: {reason}")]
    ConfigurationCorrupt { key: String, reason: String },

    /// Rejected before anything was stored.
    #[error("launch configuration for '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },

    /// Backend I/O failure.
    #[error("launch store error: {0}")]
    Storage(String),
}

impl LaunchError {
    pub(crate) fn corrupt(key: &str, reason: impl ToString) -> Self {
        LaunchError::ConfigurationCorrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(key: &str, reason: impl ToString) -> Self {
        LaunchError::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Job keys name marker and launch files, so they must be plain names.
pub fn check_job_key(key: &str) -> Result<(), LaunchError> {
    if key.is_empty() || !is_safe_name_fragment(key) {
        return Err(LaunchError::invalid(key, "job key must be a plain name"));
    }
    Ok(())
}

/// Checks shared by every backend before writing.
pub(crate) fn check_save(key: &str, config: &LaunchConfiguration) -> Result<(), LaunchError> {
    check_job_key(key)?;
    config.validate().map_err(|reason| LaunchError::invalid(key, reason))
}

/// A stored configuration that fails validation is treated as corrupt.
pub(crate) fn check_loaded(
    key: &str,
    config: LaunchConfiguration,
) -> Result<LaunchConfiguration, LaunchError> {
    config
        .validate()
        .map_err(|reason| LaunchError::corrupt(key, reason))?;
    Ok(config)
}

/// Persistence for launch configurations, keyed by job key.
pub trait LaunchStore: Send + Sync {
    /// Load the configuration stored for `key`.
    fn load(&self, key: &str) -> Result<LaunchConfiguration, LaunchError>;

    /// Store `config` for `key`, replacing any previous one.
    fn save(&self, key: &str, config: &LaunchConfiguration) -> Result<(), LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_job_key() {
        assert!(check_job_key("alice").is_ok());
        assert!(check_job_key("exp-42_run.1").is_ok());
        for bad in ["", "..", "../alice", "a/b", "a\\b"] {
            assert!(
                matches!(check_job_key(bad), Err(LaunchError::Invalid { .. })),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_check_loaded_flags_escaping_config_as_corrupt() {
        let config = LaunchConfiguration::default().with_output_name("../../escaped");
        assert!(matches!(
            check_loaded("alice", config),
            Err(LaunchError::ConfigurationCorrupt { .. })
        ));
    }
}
