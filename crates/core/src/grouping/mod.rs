//! Partitioning of input items into processing groups.
//!
//! Grouping is driven as an iterator of [`ProgressTick`](crate::progress::ProgressTick)s
//! so the caller can forward progress while items are being assigned, then
//! collect the groups with [`GroupBuild::into_groups`].

mod builder;
mod types;

pub use builder::{GroupBuild, GroupingOptions};
pub use types::ProcessingGroup;

use crate::launch::InputItem;

/// Build all groups at once, discarding progress.
pub fn build_groups(items: Vec<InputItem>, options: GroupingOptions) -> Vec<ProcessingGroup> {
    GroupBuild::new(items, options).into_groups()
}
