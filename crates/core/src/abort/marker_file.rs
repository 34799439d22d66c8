use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{AbortError, AbortSignal};
use crate::launch::is_safe_name_fragment;

/// Abort markers as hidden touch files: `{dir}/.{key}_abort`.
///
/// Lets a process other than the job runner request an abort.
#[derive(Debug, Clone)]
pub struct MarkerFileAbortSignal {
    dir: PathBuf,
}

impl MarkerFileAbortSignal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `None` for keys that would point outside `dir`.
    fn marker_path(&self, key: &str) -> Option<PathBuf> {
        (!key.is_empty() && is_safe_name_fragment(key))
            .then(|| self.dir.join(format!(".{}_abort", key)))
    }

    fn checked_path(&self, key: &str) -> Result<PathBuf, AbortError> {
        self.marker_path(key)
            .ok_or_else(|| AbortError::InvalidKey(key.to_string()))
    }

    fn io_error(key: &str, source: std::io::Error) -> AbortError {
        AbortError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl AbortSignal for MarkerFileAbortSignal {
    fn raise(&self, key: &str) -> Result<(), AbortError> {
        let path = self.checked_path(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;
        fs::write(path, b"").map_err(|e| Self::io_error(key, e))
    }

    fn is_raised(&self, key: &str) -> bool {
        self.marker_path(key).is_some_and(|path| path.is_file())
    }

    fn clear(&self, key: &str) -> Result<(), AbortError> {
        match fs::remove_file(self.checked_path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}
