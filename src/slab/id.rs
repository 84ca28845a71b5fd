//! Addresses and slab identifiers

use std::fmt;

/// Owner address width in bytes
pub const ADDRESS_LENGTH: usize = 8;

/// Fixed-width owner address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    /// Builds an address from raw owner bytes.
    ///
    /// Shorter input is left-padded with zeros; longer input keeps its
    /// trailing `ADDRESS_LENGTH` bytes.
    pub fn from_owner_bytes(bytes: &[u8]) -> Self {
        let mut address = [0u8; ADDRESS_LENGTH];
        if bytes.len() >= ADDRESS_LENGTH {
            address.copy_from_slice(&bytes[bytes.len() - ADDRESS_LENGTH..]);
        } else {
            address[ADDRESS_LENGTH - bytes.len()..].copy_from_slice(bytes);
        }
        Self(address)
    }

    /// Lower-case hex without prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Per-owner slab index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SlabIndex(pub [u8; 8]);

impl SlabIndex {
    /// Index from its big-endian integer value
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Big-endian integer value of the index
    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

/// Slab identifier: owner address + index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlabId {
    pub address: Address,
    pub index: SlabIndex,
}

/// Encoded slab identifier length
pub const SLAB_ID_LENGTH: usize = ADDRESS_LENGTH + 8;

impl SlabId {
    /// Creates a slab identifier
    pub fn new(address: Address, index: SlabIndex) -> Self {
        Self { address, index }
    }

    /// `address ‖ index`
    pub fn to_bytes(&self) -> [u8; SLAB_ID_LENGTH] {
        let mut buf = [0u8; SLAB_ID_LENGTH];
        buf[..ADDRESS_LENGTH].copy_from_slice(&self.address.0);
        buf[ADDRESS_LENGTH..].copy_from_slice(&self.index.0);
        buf
    }

    /// Parses `address ‖ index`; `None` unless exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SLAB_ID_LENGTH {
            return None;
        }
        let mut address = [0u8; ADDRESS_LENGTH];
        let mut index = [0u8; 8];
        address.copy_from_slice(&bytes[..ADDRESS_LENGTH]);
        index.copy_from_slice(&bytes[ADDRESS_LENGTH..]);
        Some(Self::new(Address(address), SlabIndex(index)))
    }

    /// An all-zero identifier marks "no slab" in link fields.
    pub fn is_undefined(&self) -> bool {
        self.address == Address::default() && self.index == SlabIndex::default()
    }
}

impl fmt::Display for SlabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.index.as_u64())
    }
}
