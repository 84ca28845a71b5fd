//! Storage adapter for slab resolution
//!
//! The resolver only ever reads. Reads and writes are separate traits so a
//! read-only source cannot accept a write and silently drop it. The
//! migration driver writes through `RegisterSink` and resolves through the
//! same sink's read side.

use std::collections::{BTreeMap, HashMap};

use crate::namespace;
use crate::observability::{Event, Logger, Severity};
use crate::slab::{Address, ResolveResult, Slab, SlabIndex};

use super::engine::{storage_key, LedgerStore};
use super::errors::StoreResult;

/// Trait for reading registers by owner and key
pub trait SlabRead {
    /// Value under `owner ‖ key`.
    /// Returns `Ok(None)` when the key is absent.
    fn get_value(&self, owner: &[u8], key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Whether a value exists; lookup errors count as absent.
    fn value_exists(&self, owner: &[u8], key: &[u8]) -> bool {
        matches!(self.get_value(owner, key), Ok(Some(_)))
    }
}

/// Trait for writing registers and allocating slab indices
pub trait SlabWrite {
    /// Store `value` under `owner ‖ key`
    fn set_value(&mut self, owner: &[u8], key: &[u8], value: Vec<u8>) -> StoreResult<()>;

    /// Next unused slab index for `owner`
    fn allocate_index(&mut self, owner: &[u8]) -> StoreResult<SlabIndex>;
}

/// Destination of a migration run
pub trait RegisterSink: SlabRead {
    /// Write a raw register under its full key
    fn put_register(&self, full_key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Write a resolved JSON value under its full key
    fn put_resolved(&self, full_key: &[u8], json: &[u8]) -> StoreResult<()>;
}

/// Read-only view of the imported registers
pub struct LedgerReader<'a> {
    store: &'a LedgerStore,
}

impl<'a> LedgerReader<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }
}

impl SlabRead for LedgerReader<'_> {
    fn get_value(&self, owner: &[u8], key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let value = self.store.get_register(owner, key)?;
        if !Logger::enabled(Severity::Trace) {
            return Ok(value);
        }
        if let Some(id) = namespace::slab_id_for_key(Address::from_owner_bytes(owner), key) {
            let slab = id.to_string();
            let found = if value.is_some() { "true" } else { "false" };
            Logger::trace(
                Event::SlabRead.as_str(),
                &[("found", found), ("slab", slab.as_str())],
            );
        }
        Ok(value)
    }
}

impl SlabRead for LedgerStore {
    fn get_value(&self, owner: &[u8], key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        LedgerReader::new(self).get_value(owner, key)
    }
}

impl RegisterSink for LedgerStore {
    fn put_register(&self, full_key: &[u8], value: &[u8]) -> StoreResult<()> {
        LedgerStore::put_register(self, full_key, value)
    }

    fn put_resolved(&self, full_key: &[u8], json: &[u8]) -> StoreResult<()> {
        LedgerStore::put_resolved(self, full_key, json)
    }
}

/// In-memory registers, used to build slab graphs before import
#[derive(Debug, Default, Clone)]
pub struct MemoryRegisters {
    registers: BTreeMap<Vec<u8>, Vec<u8>>,
    next_index: HashMap<Vec<u8>, u64>,
}

impl MemoryRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `slab` under its owner's `$index` key.
    pub fn store_slab(&mut self, slab: &Slab) -> ResolveResult<()> {
        let key = namespace::slab_key(&slab.id.index);
        self.registers
            .insert(storage_key(&slab.id.address.0, &key), slab.serialize()?);
        Ok(())
    }

    /// Registers as `(owner ‖ key, value)` in key order
    pub fn entries(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.registers
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl SlabRead for MemoryRegisters {
    fn get_value(&self, owner: &[u8], key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.registers.get(&storage_key(owner, key)).cloned())
    }
}

impl SlabWrite for MemoryRegisters {
    fn set_value(&mut self, owner: &[u8], key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.registers.insert(storage_key(owner, key), value);
        Ok(())
    }

    fn allocate_index(&mut self, owner: &[u8]) -> StoreResult<SlabIndex> {
        let next = self.next_index.entry(owner.to_vec()).or_insert(0);
        *next += 1;
        Ok(SlabIndex::from_u64(*next))
    }
}
