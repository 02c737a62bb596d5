//! Downstream hand-off for filled export blocks

use crate::block::StreamBlock;
use crate::error::Error;

/// A block the sink refused, handed back so it can be resent
pub type Rejected = (StreamBlock, Error);

/// Receives ownership of committed export blocks.
///
/// Blocks arrive in universal stream order with no gaps between them.
/// A sink that cannot take a block must return it with the error.
pub trait BlockSink {
    fn push(&mut self, block: StreamBlock) -> std::result::Result<(), Rejected>;
}

impl<S: BlockSink + ?Sized> BlockSink for Box<S> {
    fn push(&mut self, block: StreamBlock) -> std::result::Result<(), Rejected> {
        (**self).push(block)
    }
}

/// Sink that keeps every block in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    blocks: Vec<StreamBlock>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[StreamBlock] {
        &self.blocks
    }

    /// All received bytes, concatenated in stream order
    pub fn contents(&self) -> Vec<u8> {
        let len = self.blocks.iter().map(StreamBlock::offset).sum();
        let mut out = Vec::with_capacity(len);
        for block in &self.blocks {
            out.extend_from_slice(block.data());
        }
        out
    }

    pub fn into_blocks(self) -> Vec<StreamBlock> {
        self.blocks
    }
}

impl BlockSink for MemorySink {
    fn push(&mut self, block: StreamBlock) -> std::result::Result<(), Rejected> {
        self.blocks.push(block);
        Ok(())
    }
}
