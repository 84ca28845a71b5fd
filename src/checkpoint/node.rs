//! Serialized trie node records
//!
//! ```text
//! +-------------------+
//! | Record version    | (u16 BE)
//! +-------------------+
//! | Height            | (u16 BE)
//! | Left child index  | (u64 BE)
//! | Right child index | (u64 BE)
//! | Max depth         | (u16 BE)
//! | Register count    | (u64 BE)
//! +-------------------+
//! | Path              | (u16 BE length + bytes, empty for interior nodes)
//! +-------------------+
//! | Encoded payload   | (u32 BE length + bytes)
//! +-------------------+
//! | Hash              | (u16 BE length + bytes)
//! +-------------------+
//! ```

use std::io::{self, Read};

/// Highest node record version this reader understands
pub const NODE_RECORD_VERSION: u16 = 0;

/// Size of the fixed-width part following the version
const FIXED_PART_SIZE: usize = 2 + 8 + 8 + 2 + 8;

/// One trie node as stored in a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorableNode {
    /// Node height in the trie (0 for leaves)
    pub height: u16,
    /// Index of the left child record
    pub left_index: u64,
    /// Index of the right child record
    pub right_index: u64,
    /// Maximum depth of the subtrie
    pub max_depth: u16,
    /// Number of registers in the subtrie
    pub register_count: u64,
    /// Trie path; `None` for interior nodes
    pub path: Option<Vec<u8>>,
    /// Encoded payload bytes (empty for interior nodes)
    pub encoded_payload: Vec<u8>,
    /// Node hash
    pub hash: Vec<u8>,
}

impl StorableNode {
    /// A leaf carrying `path` and `encoded_payload`.
    pub fn leaf(path: Vec<u8>, encoded_payload: Vec<u8>) -> Self {
        Self {
            height: 0,
            left_index: 0,
            right_index: 0,
            max_depth: 0,
            register_count: 1,
            path: Some(path),
            encoded_payload,
            hash: vec![0u8; 32],
        }
    }

    /// An interior node pointing at two child records.
    pub fn interior(height: u16, left_index: u64, right_index: u64) -> Self {
        Self {
            height,
            left_index,
            right_index,
            max_depth: height,
            register_count: 0,
            path: None,
            encoded_payload: Vec::new(),
            hash: vec![0u8; 32],
        }
    }

    /// Returns whether the node carries a path (leaf).
    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    /// Serializes the record.
    ///
    /// Paths and hashes are at most `u16::MAX` bytes, payloads at most
    /// `u32::MAX` bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let path = self.path.as_deref().unwrap_or(&[]);
        let mut buf = Vec::with_capacity(
            2 + FIXED_PART_SIZE + 2 + path.len() + 4 + self.encoded_payload.len() + 2 + self.hash.len(),
        );

        buf.extend_from_slice(&NODE_RECORD_VERSION.to_be_bytes());
        buf.extend_from_slice(&self.height.to_be_bytes());
        buf.extend_from_slice(&self.left_index.to_be_bytes());
        buf.extend_from_slice(&self.right_index.to_be_bytes());
        buf.extend_from_slice(&self.max_depth.to_be_bytes());
        buf.extend_from_slice(&self.register_count.to_be_bytes());

        write_short_data(&mut buf, path);
        buf.extend_from_slice(&(self.encoded_payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.encoded_payload);
        write_short_data(&mut buf, &self.hash);

        buf
    }

    /// Reads one record from `reader`.
    ///
    /// Short reads surface as `io::ErrorKind::UnexpectedEof`; structurally
    /// invalid records as `io::ErrorKind::InvalidData`.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let version = read_u16(reader)?;
        if version > NODE_RECORD_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unsupported node record version {} (max {})",
                    version, NODE_RECORD_VERSION
                ),
            ));
        }

        let mut fixed = [0u8; FIXED_PART_SIZE];
        reader.read_exact(&mut fixed)?;
        let height = u16::from_be_bytes([fixed[0], fixed[1]]);
        let left_index = be_u64(&fixed[2..10]);
        let right_index = be_u64(&fixed[10..18]);
        let max_depth = u16::from_be_bytes([fixed[18], fixed[19]]);
        let register_count = be_u64(&fixed[20..28]);

        let path = read_short_data(reader)?;
        let payload_len = read_u32(reader)? as usize;
        let encoded_payload = read_exact_vec(reader, payload_len)?;
        let hash = read_short_data(reader)?;

        Ok(Self {
            height,
            left_index,
            right_index,
            max_depth,
            register_count,
            path: if path.is_empty() { None } else { Some(path) },
            encoded_payload,
            hash,
        })
    }
}

fn write_short_data(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u16).to_be_bytes());
    buf.extend_from_slice(data);
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_short_data<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u16(reader)? as usize;
    read_exact_vec(reader, len)
}

fn read_exact_vec<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    // Grow with the data instead of trusting the length prefix up front.
    let mut buf = Vec::with_capacity(len.min(64 * 1024));
    let read = reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if read < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, read),
        ));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_leaf_roundtrip() {
        let node = StorableNode::leaf(vec![7u8; 32], b"payload".to_vec());
        let bytes = node.serialize();
        let decoded = StorableNode::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_empty_path_reads_as_none() {
        let node = StorableNode::interior(3, 1, 2);
        let bytes = node.serialize();
        let decoded = StorableNode::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert!(decoded.path.is_none());
        assert_eq!(decoded.left_index, 1);
        assert_eq!(decoded.right_index, 2);
    }

    #[test]
    fn test_truncated_record_is_unexpected_eof() {
        let bytes = StorableNode::leaf(vec![1u8; 32], vec![9u8; 100]).serialize();
        let cut = &bytes[..bytes.len() - 40];
        let err = StorableNode::read_from(&mut Cursor::new(cut)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_unknown_version_is_invalid_data() {
        let mut bytes = StorableNode::interior(1, 0, 0).serialize();
        bytes[0] = 0xFF;
        let err = StorableNode::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_huge_length_prefix_does_not_preallocate() {
        let mut bytes = StorableNode::interior(1, 0, 0).serialize();
        // Payload length field follows version, fixed part and empty path.
        let offset = 2 + FIXED_PART_SIZE + 2;
        bytes[offset..offset + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = StorableNode::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
