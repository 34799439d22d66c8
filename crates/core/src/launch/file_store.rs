//! Launch store backed by one JSON file per job key.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::store::{check_job_key, check_loaded, check_save};
use super::{LaunchConfiguration, LaunchError, LaunchStore};

/// Stores each configuration as `{dir}/{key}_launch_conf.json`.
#[derive(Debug, Clone)]
pub struct FileLaunchStore {
    dir: PathBuf,
}

impl FileLaunchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_launch_conf.json", key))
    }
}

impl LaunchStore for FileLaunchStore {
    fn load(&self, key: &str) -> Result<LaunchConfiguration, LaunchError> {
        check_job_key(key)?;
        let raw = match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LaunchError::ConfigurationMissing(key.to_string()))
            }
            Err(e) => return Err(LaunchError::Storage(e.to_string())),
        };
        let config = serde_json::from_str(&raw).map_err(|e| LaunchError::corrupt(key, e))?;
        check_loaded(key, config)
    }

    fn save(&self, key: &str, config: &LaunchConfiguration) -> Result<(), LaunchError> {
        check_save(key, config)?;
        fs::create_dir_all(&self.dir).map_err(|e| LaunchError::Storage(e.to_string()))?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| LaunchError::Storage(e.to_string()))?;
        fs::write(self.path_for(key), json).map_err(|e| LaunchError::Storage(e.to_string()))
    }
}
