//! Progress sink that records every tick.

use std::sync::Mutex;

use crate::progress::{ProgressSink, ProgressTick, Stage};

/// Records ticks for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    ticks: Mutex<Vec<ProgressTick>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tick received so far, in order.
    pub fn ticks(&self) -> Vec<ProgressTick> {
        self.ticks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Ticks of one stage, in order.
    pub fn ticks_for(&self, stage: Stage) -> Vec<ProgressTick> {
        self.ticks()
            .into_iter()
            .filter(|t| t.stage == stage)
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, tick: ProgressTick) {
        self.ticks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tick);
    }
}
