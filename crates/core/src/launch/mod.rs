//! Launch configurations: the prepared, immutable input of a job.
//!
//! A configuration is saved through a [`LaunchStore`] and loaded once, when a
//! job is submitted. The job runs on that snapshot.

mod digest;
mod file_store;
mod sqlite_store;
mod store;
mod types;

pub use digest::{HourlyCount, LaunchDigest};
pub use file_store::FileLaunchStore;
pub use sqlite_store::SqliteLaunchStore;
pub use store::{check_job_key, LaunchError, LaunchStore};
pub use types::{is_safe_name_fragment, InputItem, LaunchConfiguration};
