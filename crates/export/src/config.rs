//! Export stream configuration

use serde::{Deserialize, Serialize};

/// Default size of a single export block (2 MB)
pub const DEFAULT_BLOCK_CAPACITY: usize = 2 * 1024 * 1024;

/// Configuration for an export stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Byte capacity of every block allocated by the stream
    pub block_capacity: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            block_capacity: DEFAULT_BLOCK_CAPACITY,
        }
    }
}

impl ExportConfig {
    /// Create a new config with the given block capacity
    pub fn new(block_capacity: usize) -> Self {
        Self { block_capacity }
    }

    /// Set block capacity
    pub fn with_block_capacity(mut self, capacity: usize) -> Self {
        self.block_capacity = capacity;
        self
    }

    /// Largest record that fits in one block.
    ///
    /// A block always keeps one byte of slack (`offset < capacity`).
    pub fn max_record_len(&self) -> usize {
        self.block_capacity.saturating_sub(1)
    }
}
