//! Per-group processing.
//!
//! The actual analysis of a group is opaque: it sits behind the
//! [`GroupProcessor`] trait. This module provides:
//! - [`CommandGroupProcessor`]: runs an external command once per group
//! - [`ProcessingStage`]: dispatches groups to a processor with a bounded
//!   number of calls in flight, polling the abort signal before every dispatch
//!
//! # Example
//!
//! ```ignore
//! use phenorun_core::processor::{ProcessingStage, GroupContext};
//!
//! let stage = ProcessingStage::new(processor, abort, 4);
//! let outcome = stage.run(&groups, &ctx, &reporter).await;
//! println!("{} done, {} failed", outcome.completed, outcome.failed.len());
//! ```

mod command;
mod error;
mod stage;
mod traits;
mod types;

pub use command::CommandGroupProcessor;
pub use error::GroupProcessingError;
pub use stage::ProcessingStage;
pub use traits::GroupProcessor;
pub use types::{FailedGroup, GroupArtifact, GroupContext, StageOutcome};
