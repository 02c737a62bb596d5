//! Fixed-capacity export block
//!
//! A `StreamBlock` holds a contiguous run of committed tuple bytes and knows
//! where that run sits in the universal stream (USO). Its occupied range is
//! `[uso, uso + offset)`.
//!
//! Reads are public. Writes (`mutable_data`, `consumed`, `truncate_to`) are
//! crate-private and only used by the owning [`ExportStream`](crate::ExportStream).

use crate::error::{Error, Result};

/// A single export data block with append-only buffer semantics
pub struct StreamBlock {
    data: Box<[u8]>,
    /// Position of the next write, relative to `uso`
    offset: usize,
    /// Universal stream offset of `offset == 0`
    uso: u64,
}

impl std::fmt::Debug for StreamBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBlock")
            .field("uso", &self.uso)
            .field("offset", &self.offset)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl StreamBlock {
    /// Take ownership of a pre-allocated buffer starting at `uso`.
    ///
    /// The block's capacity is the buffer length.
    pub fn new(data: Box<[u8]>, uso: u64) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::ZeroCapacity);
        }
        Ok(Self {
            data,
            offset: 0,
            uso,
        })
    }

    /// Allocate a zeroed block of `capacity` bytes starting at `uso`.
    pub fn allocate(capacity: usize, uso: u64) -> Result<Self> {
        Self::new(vec![0u8; capacity].into_boxed_slice(), uso)
    }

    /// Committed bytes of this block.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.offset]
    }

    /// Universal stream offset of the block, not including any of its bytes.
    pub fn uso(&self) -> u64 {
        self.uso
    }

    /// Bytes written so far. `uso() + offset()` is the universal stream
    /// offset of the entire block.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Universal stream offset of the next byte to be written.
    pub fn end_uso(&self) -> u64 {
        self.uso + self.offset as u64
    }

    /// Largest `n` that `consumed(n)` still accepts.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.offset - 1
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    /// Whether `uso` falls in `[uso(), end_uso()]`.
    pub fn contains(&self, uso: u64) -> bool {
        self.uso <= uso && uso <= self.end_uso()
    }

    /// Writable window from the write cursor to the end of the buffer.
    pub(crate) fn mutable_data(&mut self) -> &mut [u8] {
        &mut self.data[self.offset..]
    }

    /// Commit `consumed` bytes written through `mutable_data`.
    ///
    /// The cursor must stay strictly below capacity and `uso + offset` must
    /// stay representable; on failure the block is left untouched.
    pub(crate) fn consumed(&mut self, consumed: usize) -> Result<()> {
        self.offset = self.check_consumed(consumed)?;
        Ok(())
    }

    /// Cursor position after committing `consumed` more bytes
    fn check_consumed(&self, consumed: usize) -> Result<usize> {
        let capacity = self.capacity();
        let next = match self.offset.checked_add(consumed) {
            Some(next) if next < capacity => next,
            _ => {
                tracing::error!(
                    "Export block overflow: uso {} offset {} consumed {} capacity {}",
                    self.uso,
                    self.offset,
                    consumed,
                    capacity
                );
                return Err(Error::Overflow {
                    offset: self.offset,
                    consumed,
                    capacity,
                });
            }
        };
        if self.uso.checked_add(next as u64).is_none() {
            tracing::error!(
                "Universal stream offset exhausted: uso {} offset {} consumed {}",
                self.uso,
                self.offset,
                consumed
            );
            return Err(Error::UsoOverflow {
                uso: self.uso,
                offset: self.offset,
                consumed,
            });
        }
        Ok(next)
    }

    /// Rewind the write cursor to the universal stream offset `mark`.
    ///
    /// Bytes are not erased; only the logical end of data moves.
    pub(crate) fn truncate_to(&mut self, mark: u64) -> Result<()> {
        if !self.contains(mark) {
            tracing::error!(
                "Export block truncation outside of block: uso {} offset {} mark {}",
                self.uso,
                self.offset,
                mark
            );
            return Err(Error::InvalidTruncation {
                uso: self.uso,
                offset: self.offset,
                mark,
            });
        }
        self.offset = (mark - self.uso) as usize;
        Ok(())
    }

    /// Copy `bytes` in at the write cursor and commit them.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let next = self.check_consumed(bytes.len())?;
        self.mutable_data()[..bytes.len()].copy_from_slice(bytes);
        self.offset = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, uso: u64, len: usize) -> StreamBlock {
        let mut block = StreamBlock::allocate(capacity, uso).unwrap();
        let bytes: Vec<u8> = (0..len).map(|i| i as u8).collect();
        block.append(&bytes).unwrap();
        block
    }

    #[test]
    fn test_initial_state() {
        for (capacity, uso) in [(1, 0), (10, 0), (1024, 7), (4096, u64::MAX / 2)] {
            let block = StreamBlock::allocate(capacity, uso).unwrap();
            assert_eq!(block.offset(), 0);
            assert_eq!(block.uso(), uso);
            assert_eq!(block.capacity(), capacity);
            assert!(block.is_empty());
            assert!(block.data().is_empty());
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = StreamBlock::new(Vec::new().into_boxed_slice(), 0);
        assert_eq!(result.unwrap_err(), Error::ZeroCapacity);
    }

    #[test]
    fn test_consumed_accumulates() {
        let mut block = StreamBlock::allocate(100, 0).unwrap();
        let mut total = 0;
        for n in [0, 5, 17, 30, 40] {
            block.consumed(n).unwrap();
            total += n;
            assert_eq!(block.offset(), total);
        }
        assert_eq!(block.remaining(), 100 - total - 1);
    }

    #[test]
    fn test_consumed_rejects_full_block() {
        let mut block = StreamBlock::allocate(10, 0).unwrap();
        block.consumed(9).unwrap();
        let err = block.consumed(1).unwrap_err();
        assert_eq!(
            err,
            Error::Overflow {
                offset: 9,
                consumed: 1,
                capacity: 10
            }
        );
        assert!(err.is_invariant_violation());
        assert_eq!(block.offset(), 9);

        // usize overflow must not wrap around
        assert!(block.consumed(usize::MAX).is_err());
        assert_eq!(block.offset(), 9);
    }

    #[test]
    fn test_truncate_within_range() {
        let mut block = filled(1024, 100, 50);

        block.truncate_to(150).unwrap();
        assert_eq!(block.offset(), 50);

        block.truncate_to(120).unwrap();
        assert_eq!(block.offset(), 20);

        block.truncate_to(100).unwrap();
        assert_eq!(block.offset(), 0);
    }

    #[test]
    fn test_truncate_out_of_range() {
        let mut block = filled(1024, 100, 50);

        for mark in [0, 99, 151, u64::MAX] {
            let err = block.truncate_to(mark).unwrap_err();
            assert_eq!(
                err,
                Error::InvalidTruncation {
                    uso: 100,
                    offset: 50,
                    mark
                }
            );
            assert_eq!(block.offset(), 50);
        }
    }

    #[test]
    fn test_truncate_keeps_prefix_bytes() {
        let mut block = filled(64, 0, 10);
        block.truncate_to(4).unwrap();
        assert_eq!(block.data(), &[0, 1, 2, 3]);

        block.append(&[9, 9]).unwrap();
        assert_eq!(block.data(), &[0, 1, 2, 3, 9, 9]);
        assert_eq!(block.end_uso(), 6);
    }

    #[test]
    fn test_mutable_data_window() {
        let mut block = StreamBlock::allocate(16, 0).unwrap();
        block.consumed(6).unwrap();
        assert_eq!(block.mutable_data().len(), 10);

        block.mutable_data()[..3].copy_from_slice(b"abc");
        block.consumed(3).unwrap();
        assert_eq!(&block.data()[6..], b"abc");
    }

    #[test]
    fn test_scenario_write_then_rollback() {
        let mut block = StreamBlock::allocate(1024, 0).unwrap();
        block.append(&[1u8; 200]).unwrap();
        block.append(&[2u8; 100]).unwrap();
        assert_eq!(block.offset(), 300);

        block.truncate_to(250).unwrap();
        assert_eq!(block.offset(), 250);

        assert!(block.truncate_to(260).is_err());
        assert_eq!(block.offset(), 250);
        assert_eq!(block.uso() + block.offset() as u64, block.end_uso());
        assert_eq!(block.data().len(), 250);
    }

    #[test]
    fn test_consumed_rejects_uso_overflow() {
        let mut block = StreamBlock::allocate(16, u64::MAX - 2).unwrap();
        block.consumed(2).unwrap();
        assert_eq!(block.end_uso(), u64::MAX);

        let err = block.consumed(1).unwrap_err();
        assert_eq!(
            err,
            Error::UsoOverflow {
                uso: u64::MAX - 2,
                offset: 2,
                consumed: 1
            }
        );
        assert!(block.append(b"x").is_err());
        assert_eq!(block.offset(), 2);
        assert!(block.contains(u64::MAX));
    }

    #[test]
    fn test_append_too_large_leaves_block_untouched() {
        let mut block = StreamBlock::allocate(8, 0).unwrap();
        block.append(b"abc").unwrap();
        assert!(block.append(b"defgh").is_err());
        assert_eq!(block.data(), b"abc");
    }
}
