//! Checkpoint header
//!
//! ```text
//! +-------------------+
//! | Format marker 0   | (u16 BE)
//! +-------------------+
//! | Format marker 1   | (u16 BE)
//! +-------------------+
//! | Node count        | (u64 BE)
//! +-------------------+
//! | Trailer marker    | (u16 BE)
//! +-------------------+
//! ```
//!
//! The markers are carried through for reporting only; the node count caps
//! how many records the reader will consume.

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 2 + 2 + 8 + 2;

/// Parsed checkpoint header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointHeader {
    /// Format version markers (magic, version)
    pub format_markers: [u16; 2],
    /// Number of node records that follow the header
    pub node_count: u64,
    /// Trailing marker
    pub trailer: u16,
}

impl CheckpointHeader {
    /// Header for `node_count` records with zeroed markers.
    pub fn new(node_count: u64) -> Self {
        Self {
            format_markers: [0, 0],
            node_count,
            trailer: 0,
        }
    }

    /// Parses the fixed-size header.
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            format_markers: [
                u16::from_be_bytes([buf[0], buf[1]]),
                u16::from_be_bytes([buf[2], buf[3]]),
            ],
            node_count: u64::from_be_bytes([
                buf[4], buf[5], buf[6], buf[7], buf[8], buf[9], buf[10], buf[11],
            ]),
            trailer: u16::from_be_bytes([buf[12], buf[13]]),
        }
    }

    /// Serializes the header.
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.format_markers[0].to_be_bytes());
        buf[2..4].copy_from_slice(&self.format_markers[1].to_be_bytes());
        buf[4..12].copy_from_slice(&self.node_count.to_be_bytes());
        buf[12..14].copy_from_slice(&self.trailer.to_be_bytes());
        buf
    }
}
