//! Export stream coordinator
//!
//! Owns the chain of [`StreamBlock`]s for one export source:
//! - Appends serialized records into the current block, retiring it when full
//! - Tracks the committed watermark per transaction
//! - Rolls back aborted data by dropping or truncating blocks
//! - Hands fully committed blocks to a [`BlockSink`] in stream order
//!
//! Only committed bytes ever leave the stream. A block that still holds
//! bytes from the open transaction stays buffered until that transaction
//! commits.

use crate::block::StreamBlock;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::sink::BlockSink;
use std::collections::VecDeque;

/// Coordinator that buffers export data and hands it downstream
pub struct ExportStream<S: BlockSink> {
    config: ExportConfig,
    sink: S,

    /// Retired blocks not yet handed to the sink, oldest first
    pending: VecDeque<StreamBlock>,

    /// Block currently receiving appends
    current: Option<StreamBlock>,

    /// Universal stream offset of the next byte to be written
    uso: u64,

    /// Everything before this offset belongs to committed transactions
    committed_uso: u64,

    open_txn: Option<u64>,
}

impl<S: BlockSink> ExportStream<S> {
    /// Create a stream starting at offset zero
    pub fn new(config: ExportConfig, sink: S) -> Result<Self> {
        Self::with_starting_uso(config, sink, 0)
    }

    /// Create a stream that resumes at `uso` (e.g. after a restart)
    pub fn with_starting_uso(config: ExportConfig, sink: S, uso: u64) -> Result<Self> {
        if config.block_capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(Self {
            config,
            sink,
            pending: VecDeque::new(),
            current: None,
            uso,
            committed_uso: uso,
            open_txn: None,
        })
    }

    /// Append one serialized record on behalf of `txn_id`.
    ///
    /// A different `txn_id` than the open one implicitly commits the open
    /// transaction first. Returns the offset of the record's first byte,
    /// which can later be passed to [`rollback_to`](Self::rollback_to).
    pub fn append(&mut self, txn_id: u64, record: &[u8]) -> Result<u64> {
        let max = self.config.max_record_len();
        if record.len() > max {
            return Err(Error::RecordTooLarge {
                len: record.len(),
                max,
            });
        }

        if let Some(open) = self.open_txn
            && open != txn_id
        {
            self.commit(open)?;
        }

        let mut block = match self.current.take() {
            Some(block) if block.remaining() >= record.len() => block,
            previous => self.extend_block_chain(previous)?,
        };

        let mark = self.uso;
        let result = block.append(record);
        self.current = Some(block);
        result?;

        self.uso += record.len() as u64;
        self.open_txn = Some(txn_id);
        Ok(mark)
    }

    /// Retire `previous` and allocate a fresh block at the current offset
    fn extend_block_chain(&mut self, previous: Option<StreamBlock>) -> Result<StreamBlock> {
        if let Some(block) = previous
            && !block.is_empty()
        {
            tracing::debug!(
                "Retiring export block [{}, {})",
                block.uso(),
                block.end_uso()
            );
            self.pending.push_back(block);
        }
        StreamBlock::allocate(self.config.block_capacity, self.uso)
    }

    /// Mark everything written by `txn_id` as committed.
    ///
    /// Committing when no transaction is open is a no-op.
    pub fn commit(&mut self, txn_id: u64) -> Result<()> {
        match self.open_txn {
            Some(open) if open == txn_id => {}
            None => return Ok(()),
            expected => {
                return Err(Error::TransactionMismatch {
                    expected,
                    actual: txn_id,
                });
            }
        }

        self.committed_uso = self.uso;
        self.open_txn = None;
        self.push_committed()
    }

    /// Discard everything written at or after `mark`.
    ///
    /// `mark` must lie between the committed watermark and the end of the
    /// stream. Blocks that start after `mark` are released; the block that
    /// contains it is truncated and becomes the current block.
    pub fn rollback_to(&mut self, txn_id: u64, mark: u64) -> Result<()> {
        if let Some(open) = self.open_txn
            && open != txn_id
        {
            return Err(Error::TransactionMismatch {
                expected: Some(open),
                actual: txn_id,
            });
        }

        if mark < self.committed_uso || mark > self.uso {
            tracing::error!(
                "Rollback of txn {} to {} outside of [{}, {}]",
                txn_id,
                mark,
                self.committed_uso,
                self.uso
            );
            return Err(Error::InvalidRollback {
                mark,
                committed: self.committed_uso,
                end: self.uso,
            });
        }

        let mut next = self.current.take().or_else(|| self.pending.pop_back());
        while let Some(mut block) = next {
            if block.uso() > mark {
                tracing::debug!(
                    "Dropping export block [{}, {}) on rollback to {}",
                    block.uso(),
                    block.end_uso(),
                    mark
                );
                next = self.pending.pop_back();
                continue;
            }
            let result = block.truncate_to(mark);
            self.current = Some(block);
            result?;
            break;
        }

        self.uso = mark;
        if mark == self.committed_uso {
            self.open_txn = None;
        }
        Ok(())
    }

    /// Hand off all committed data, including a partially filled block.
    ///
    /// While a transaction is open only retired, fully committed blocks are
    /// handed off.
    pub fn flush(&mut self) -> Result<()> {
        if self.open_txn.is_none()
            && let Some(block) = self.current.take()
            && !block.is_empty()
        {
            self.pending.push_back(block);
        }
        self.push_committed()
    }

    fn push_committed(&mut self) -> Result<()> {
        while self
            .pending
            .front()
            .is_some_and(|block| block.end_uso() <= self.committed_uso)
        {
            let Some(block) = self.pending.pop_front() else {
                break;
            };
            let (start, end) = (block.uso(), block.end_uso());
            if let Err((block, e)) = self.sink.push(block) {
                tracing::warn!("Failed to hand off export block [{}, {}): {}", start, end, e);
                self.pending.push_front(block);
                return Err(e);
            }
            tracing::debug!("Handed off export block [{}, {})", start, end);
        }
        Ok(())
    }

    /// Universal stream offset of the next byte to be written
    pub fn uso(&self) -> u64 {
        self.uso
    }

    pub fn committed_uso(&self) -> u64 {
        self.committed_uso
    }

    pub fn open_transaction(&self) -> Option<u64> {
        self.open_txn
    }

    /// Number of blocks still owned by the stream
    pub fn pending_blocks(&self) -> usize {
        self.pending.len() + usize::from(self.current.is_some())
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the stream, releasing any buffered blocks
    pub fn into_sink(self) -> S {
        self.sink
    }
}
