use std::collections::HashSet;
use std::sync::RwLock;

use super::{AbortError, AbortSignal};

/// In-process abort markers. Only raised keys are held.
#[derive(Debug, Default)]
pub struct MemoryAbortSignal {
    raised: RwLock<HashSet<String>>,
}

impl MemoryAbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of markers currently raised.
    pub fn raised_count(&self) -> usize {
        self.raised.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl AbortSignal for MemoryAbortSignal {
    fn raise(&self, key: &str) -> Result<(), AbortError> {
        self.raised
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string());
        Ok(())
    }

    fn is_raised(&self, key: &str) -> bool {
        self.raised
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    fn clear(&self, key: &str) -> Result<(), AbortError> {
        self.raised
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
