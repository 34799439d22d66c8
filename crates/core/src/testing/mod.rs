//! Testing utilities and mock implementations.
//!
//! This module provides a mock group processor and a recording progress sink,
//! allowing the job lifecycle to be tested without a real pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use phenorun_core::testing::{fixtures, MockGroupProcessor};
//!
//! let processor = Arc::new(
//!     MockGroupProcessor::new()
//!         .with_delay(Duration::from_millis(20))
//!         .fail_group("img-3"),
//! );
//! let runner = JobRunner::new(store, abort, processor.clone(), data_dir, JobsConfig::default());
//! runner.submit_with("alice", &fixtures::launch_config(10))?;
//! ```

mod mock_processor;
mod recording_sink;

pub use mock_processor::MockGroupProcessor;
pub use recording_sink::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::launch::{InputItem, LaunchConfiguration};

    /// `n` bare items named `img-0` .. `img-{n-1}`.
    pub fn items(n: usize) -> Vec<InputItem> {
        (0..n).map(|i| InputItem::new(format!("img-{i}"))).collect()
    }

    /// A timestamp on 2021-03-04 at `hour:minute`.
    pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 4)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid fixture timestamp")
    }

    /// An item of plant `plant` seen by the `vis` top camera at `hour:minute`.
    pub fn series_item(id: &str, plant: &str, hour: u32, minute: u32) -> InputItem {
        InputItem::new(id)
            .with_plant(plant)
            .with_camera("vis")
            .with_view_option("top")
            .with_date_time(at(hour, minute))
    }

    /// Configuration with `n` bare items, one thread and no grouping.
    pub fn launch_config(n: usize) -> LaunchConfiguration {
        LaunchConfiguration::default()
            .with_items(items(n))
            .with_owner("tester")
    }
}
