//! Sequential checkpoint reader
//!
//! - The header is read first and caps the number of node records
//! - Records are read strictly in order, never seeked or memory-mapped
//! - No byte past the last counted record is consumed
//! - Any short read or malformed record is fatal

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::errors::{CheckpointError, CheckpointResult};
use super::header::{CheckpointHeader, HEADER_SIZE};
use super::node::StorableNode;

/// Checkpoint reader over any byte stream.
pub struct CheckpointReader<R> {
    reader: R,
    header: Option<CheckpointHeader>,
    nodes_read: u64,
}

impl CheckpointReader<BufReader<File>> {
    /// Opens a checkpoint file for sequential reading.
    pub fn open(path: &Path) -> CheckpointResult<Self> {
        let file = File::open(path).map_err(|e| {
            CheckpointError::open_failed(
                format!("failed to open checkpoint: {}", path.display()),
                e,
            )
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> CheckpointReader<R> {
    /// Wraps a stream positioned at the start of a checkpoint.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: None,
            nodes_read: 0,
        }
    }

    /// Reads the header. Repeated calls return the header read first.
    pub fn read_header(&mut self) -> CheckpointResult<CheckpointHeader> {
        if let Some(header) = self.header {
            return Ok(header);
        }

        let mut buf = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut buf).map_err(|e| {
            CheckpointError::truncated(
                format!("checkpoint header shorter than {} bytes", HEADER_SIZE),
                e,
            )
        })?;

        let header = CheckpointHeader::parse(&buf);
        self.header = Some(header);
        Ok(header)
    }

    /// Reads the next node record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(node))` for records 1..=node_count
    /// - `Ok(None)` once node_count records have been read
    /// - `Err(EndOfStream | Malformed)` if the record cannot be read
    pub fn next_node(&mut self) -> CheckpointResult<Option<StorableNode>> {
        let header = self.read_header()?;
        if self.nodes_read >= header.node_count {
            return Ok(None);
        }

        let index = self.nodes_read + 1;
        let node = StorableNode::read_from(&mut self.reader).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => CheckpointError::malformed(index, e.to_string()),
            _ => CheckpointError::from_record_io(index, e),
        })?;

        self.nodes_read = index;
        Ok(Some(node))
    }

    /// Number of node records read so far.
    pub fn nodes_read(&self) -> u64 {
        self.nodes_read
    }

    /// Number of node records still to be read, once the header is known.
    pub fn remaining(&self) -> Option<u64> {
        self.header
            .map(|h| h.node_count.saturating_sub(self.nodes_read))
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for CheckpointReader<R> {
    type Item = CheckpointResult<StorableNode>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_node().transpose()
    }
}
