//! Export stream buffering for committed tuple data
//!
//! This crate provides the block layer of the export (change stream) pipeline.
//! Serialized tuples are appended into fixed-capacity blocks, each of which
//! records where its bytes sit in the universal stream offset (USO) space.
//! It supports:
//! - Append with implicit per-transaction commit tracking
//! - Rollback of uncommitted data via block truncation
//! - Hand-off of committed blocks to a downstream sink in stream order
//!
//! # Architecture
//!
//! `StreamBlock` is a plain owned buffer with a write cursor. Its mutating
//! operations are private to this crate, so only `ExportStream` (the owning
//! coordinator) can write to or truncate a block. Once a block is handed to
//! a `BlockSink` it is read-only and released when the sink drops it.

pub mod block;
pub mod config;
pub mod error;
pub mod sink;
pub mod stream;

// Re-export main types
pub use block::StreamBlock;
pub use config::ExportConfig;
pub use error::{Error, Result};
pub use sink::{BlockSink, MemorySink, Rejected};
pub use stream::ExportStream;
