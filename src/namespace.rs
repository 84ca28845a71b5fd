//! Path classification
//!
//! Decides from a path's bytes whether a register belongs to the plain
//! ledger namespace or to the slab-backed object-storage namespace, and
//! recognises slab-addressed register keys.

use crate::slab::{Address, SlabId, SlabIndex};

/// Marker segment of the object-storage namespace, including its separator
pub const STORAGE_MARKER: &[u8] = b"storage\x1f";

/// First byte of a slab register key
pub const SLAB_KEY_PREFIX: u8 = b'$';

/// Slab register key length: prefix byte + 8 index bytes
pub const SLAB_KEY_LENGTH: usize = 1 + 8;

/// Routing class of a register path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Raw opaque value, written as-is
    Plain,
    /// Slab-backed structured value, resolved before reporting
    ObjectStorage,
}

impl PathClass {
    /// Lower-case name for log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            PathClass::Plain => "plain",
            PathClass::ObjectStorage => "object_storage",
        }
    }
}

/// Classifies a path.
///
/// `ObjectStorage` iff the path contains `storage` immediately followed by
/// the separator anywhere, not only at the start.
pub fn classify(path: &[u8]) -> PathClass {
    if path
        .windows(STORAGE_MARKER.len())
        .any(|window| window == STORAGE_MARKER)
    {
        PathClass::ObjectStorage
    } else {
        PathClass::Plain
    }
}

/// Returns whether `key` addresses a slab: exactly 9 bytes, first byte `$`.
pub fn is_slab_key(key: &[u8]) -> bool {
    key.len() == SLAB_KEY_LENGTH && key[0] == SLAB_KEY_PREFIX
}

/// Slab identifier for a register key, or `None` if the key is not a slab key.
pub fn slab_id_for_key(address: Address, key: &[u8]) -> Option<SlabId> {
    if !is_slab_key(key) {
        return None;
    }
    let mut index = [0u8; 8];
    index.copy_from_slice(&key[1..]);
    Some(SlabId::new(address, SlabIndex(index)))
}

/// Register key under which a slab is stored: `$ ‖ index`
pub fn slab_key(index: &SlabIndex) -> [u8; SLAB_KEY_LENGTH] {
    let mut key = [0u8; SLAB_KEY_LENGTH];
    key[0] = SLAB_KEY_PREFIX;
    key[1..].copy_from_slice(&index.0);
    key
}
