//! Register keys
//!
//! A payload key is an ordered list of typed parts. Only three positions are
//! meaningful to the migration:
//!
//! | index | part       | used downstream |
//! |-------|------------|-----------------|
//! | 0     | owner      | yes             |
//! | 1     | controller | no              |
//! | 2     | key (path) | yes             |

use super::errors::{PayloadError, PayloadResult};

/// Index of the owner part
pub const KEY_PART_OWNER: usize = 0;
/// Index of the controller part
pub const KEY_PART_CONTROLLER: usize = 1;
/// Index of the register key (path) part
pub const KEY_PART_PATH: usize = 2;

/// Reserved separator between path segments; never valid inside a segment
pub const PATH_SEPARATOR: u8 = 0x1F;

/// One typed key part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    /// Part type tag
    pub kind: u16,
    /// Raw part value
    pub value: Vec<u8>,
}

impl KeyPart {
    /// Creates a key part
    pub fn new(kind: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Ordered key parts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Key {
    pub parts: Vec<KeyPart>,
}

impl Key {
    /// Creates a key from parts
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self { parts }
    }

    /// The usual three-part register key with part kinds 0, 1, 2.
    pub fn register(owner: &[u8], controller: &[u8], path: &[u8]) -> Self {
        Self::new(vec![
            KeyPart::new(KEY_PART_OWNER as u16, owner),
            KeyPart::new(KEY_PART_CONTROLLER as u16, controller),
            KeyPart::new(KEY_PART_PATH as u16, path),
        ])
    }
}

/// A decoded register: key and opaque value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub key: Key,
    pub value: Vec<u8>,
}

impl Payload {
    /// Creates a payload
    pub fn new(key: Key, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Extracts owner (part 0) and path (part 2).
    ///
    /// Part 1 (controller) is skipped; parts past index 2 are ignored.
    pub fn logical_key(&self) -> PayloadResult<LogicalKey> {
        let parts = &self.key.parts;
        if parts.len() <= KEY_PART_PATH {
            return Err(PayloadError::MissingKeyParts(parts.len()));
        }
        Ok(LogicalKey::new(
            parts[KEY_PART_OWNER].value.clone(),
            parts[KEY_PART_PATH].value.clone(),
        ))
    }
}

/// Owner-scoped register key as written to the output store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalKey {
    /// Raw owner bytes as found in the payload
    pub owner: Vec<u8>,
    /// Separator-delimited path bytes
    pub path: Vec<u8>,
}

impl LogicalKey {
    /// Creates a logical key
    pub fn new(owner: impl Into<Vec<u8>>, path: impl Into<Vec<u8>>) -> Self {
        Self {
            owner: owner.into(),
            path: path.into(),
        }
    }

    /// Store key: `owner ‖ path`
    pub fn storage_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.owner.len() + self.path.len());
        key.extend_from_slice(&self.owner);
        key.extend_from_slice(&self.path);
        key
    }

    /// Path segments split on the separator
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.path.split(|b| *b == PATH_SEPARATOR)
    }

    /// Path with separators rendered as `/`, for log lines
    pub fn display_path(&self) -> String {
        self.segments()
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join("/")
    }
}
