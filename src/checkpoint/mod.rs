//! Checkpoint reader
//!
//! A checkpoint is a point-in-time binary snapshot of a trie-structured
//! ledger: a fixed header followed by `node_count` serialized trie nodes.
//!
//! # Design Principles
//!
//! - Sequential only (buffered stream, no seeking, no mmap)
//! - Big-endian fixed-width integers throughout
//! - The header's node count is the only bound on records consumed
//! - Any short read or malformed record aborts the run

mod errors;
mod header;
mod node;
mod reader;

pub use errors::{CheckpointError, CheckpointErrorCode, CheckpointResult};
pub use header::{CheckpointHeader, HEADER_SIZE};
pub use node::{StorableNode, NODE_RECORD_VERSION};
pub use reader::CheckpointReader;
