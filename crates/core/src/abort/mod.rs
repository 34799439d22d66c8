//! Out-of-band abort markers, keyed by job.
//!
//! A marker is raised by whoever wants the job to stop (typically a separate
//! request handler) and polled by the job at its checkpoints. Raising never
//! interrupts work that is already running.

mod marker_file;
mod memory;

pub use marker_file::MarkerFileAbortSignal;
pub use memory::MemoryAbortSignal;

use thiserror::Error;

/// Error raised by an abort backend.
#[derive(Debug, Error)]
pub enum AbortError {
    #[error("abort marker I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("job key '{0}' cannot name an abort marker")]
    InvalidKey(String),
}

/// A boolean marker per job key, safe to use from any task.
pub trait AbortSignal: Send + Sync {
    /// Set the marker. Raising an already raised marker is a no-op.
    fn raise(&self, key: &str) -> Result<(), AbortError>;

    /// Current marker state. Never blocks on the job.
    fn is_raised(&self, key: &str) -> bool;

    /// Reset the marker so a stale abort cannot pre-empt a new run.
    fn clear(&self, key: &str) -> Result<(), AbortError>;
}
