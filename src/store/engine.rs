//! Output store on redb
//!
//! One `Database` per run, opened once and shared. Every read or write
//! opens its own transaction and releases it before returning; no
//! transaction spans two nodes.
//!
//! Tables:
//! - `registers`: `owner ‖ path -> raw value`
//! - `resolved`:  `owner ‖ path -> JSON logical value`

use std::io;
use std::path::Path;

use redb::{Database, ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::errors::{StoreError, StoreResult};

/// Raw registers imported from the checkpoint
pub const REGISTERS: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("registers");

/// Resolved object-storage values
pub const RESOLVED: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("resolved");

/// Persistent key-value store the migration writes into
pub struct LedgerStore {
    db: Database,
}

impl LedgerStore {
    /// Opens or creates the store at `path` and makes sure both tables exist.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(|e| {
            StoreError::open_failed(format!("cannot open store at {}", path.display()), e)
        })?;

        let txn = db
            .begin_write()
            .map_err(|e| StoreError::open_failed("cannot begin setup transaction", e))?;
        {
            txn.open_table(REGISTERS)
                .map_err(|e| StoreError::open_failed("cannot create registers table", e))?;
            txn.open_table(RESOLVED)
                .map_err(|e| StoreError::open_failed("cannot create resolved table", e))?;
        }
        txn.commit()
            .map_err(|e| StoreError::open_failed("cannot commit setup transaction", e))?;

        Ok(Self { db })
    }

    /// Opens a store an earlier run created. A missing file is an open
    /// failure; nothing is created.
    pub fn open_existing(path: &Path) -> StoreResult<Self> {
        if !path.is_file() {
            return Err(StoreError::open_failed(
                format!("no store at {}", path.display()),
                redb::Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "store file does not exist",
                )),
            ));
        }
        let db = Database::open(path).map_err(|e| {
            StoreError::open_failed(format!("cannot open store at {}", path.display()), e)
        })?;
        Ok(Self { db })
    }

    /// Runs `f` inside one read transaction, released when `f` returns.
    pub fn with_read<T>(
        &self,
        f: impl FnOnce(&ReadTransaction) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::read_failed("cannot begin read transaction", e))?;
        f(&txn)
    }

    /// Raw register under `owner ‖ key`
    pub fn get_register(&self, owner: &[u8], key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.get(REGISTERS, &storage_key(owner, key))
    }

    /// Resolved JSON value under `owner ‖ key`
    pub fn get_resolved(&self, owner: &[u8], key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.get(RESOLVED, &storage_key(owner, key))
    }

    /// Value stored under a full key in `table`
    pub fn get(
        &self,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
        key: &[u8],
    ) -> StoreResult<Option<Vec<u8>>> {
        self.with_read(|txn| {
            let table = txn
                .open_table(table)
                .map_err(|e| StoreError::read_failed("cannot open table", e).with_key(key))?;
            let value = table
                .get(key)
                .map_err(|e| StoreError::read_failed("lookup failed", e).with_key(key))?;
            Ok(value.map(|guard| guard.value().to_vec()))
        })
    }

    /// Writes a raw register under its full key.
    pub fn put_register(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.put(REGISTERS, key, value)
    }

    /// Writes a resolved value under its full key.
    pub fn put_resolved(&self, key: &[u8], json: &[u8]) -> StoreResult<()> {
        self.put(RESOLVED, key, json)
    }

    fn put(
        &self,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
        key: &[u8],
        value: &[u8],
    ) -> StoreResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::write_failed("cannot begin write transaction", e))?;
        {
            let mut table = txn
                .open_table(table)
                .map_err(|e| StoreError::write_failed("cannot open table", e).with_key(key))?;
            table
                .insert(key, value)
                .map_err(|e| StoreError::write_failed("insert failed", e).with_key(key))?;
        }
        txn.commit()
            .map_err(|e| StoreError::write_failed("commit failed", e).with_key(key))?;
        Ok(())
    }

    /// All entries of `table` in key order
    pub fn entries(
        &self,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
    ) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.with_read(|txn| {
            let table = txn
                .open_table(table)
                .map_err(|e| StoreError::read_failed("cannot open table", e))?;
            let mut entries = Vec::new();
            for entry in table
                .iter()
                .map_err(|e| StoreError::read_failed("cannot iterate table", e))?
            {
                let (key, value) =
                    entry.map_err(|e| StoreError::read_failed("cannot read entry", e))?;
                entries.push((key.value().to_vec(), value.value().to_vec()));
            }
            Ok(entries)
        })
    }

    /// Number of entries in `table`
    pub fn count(
        &self,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
    ) -> StoreResult<u64> {
        self.with_read(|txn| {
            let table = txn
                .open_table(table)
                .map_err(|e| StoreError::read_failed("cannot open table", e))?;
            table
                .len()
                .map_err(|e| StoreError::read_failed("cannot count table", e))
        })
    }
}

/// Lookup key: `owner ‖ key`
pub fn storage_key(owner: &[u8], key: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(owner.len() + key.len());
    full.extend_from_slice(owner);
    full.extend_from_slice(key);
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreErrorCode;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, LedgerStore) {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(&dir.path().join("ledger.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_then_get_register() {
        let (_dir, store) = open_temp();
        let key = storage_key(&[0, 1], b"public\x1fbalance");
        store.put_register(&key, b"\x01\x02").unwrap();

        assert_eq!(
            store.get_register(&[0, 1], b"public\x1fbalance").unwrap(),
            Some(b"\x01\x02".to_vec())
        );
        assert_eq!(store.get_register(&[0, 2], b"public\x1fbalance").unwrap(), None);
        assert_eq!(store.count(REGISTERS).unwrap(), 1);
        assert_eq!(store.count(RESOLVED).unwrap(), 0);
    }

    #[test]
    fn test_overwrite_keeps_one_entry() {
        let (_dir, store) = open_temp();
        store.put_register(b"k", b"v1").unwrap();
        store.put_register(b"k", b"v2").unwrap();
        assert_eq!(
            store.entries(REGISTERS).unwrap(),
            vec![(b"k".to_vec(), b"v2".to_vec())]
        );
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.redb");
        {
            let store = LedgerStore::open(&path).unwrap();
            store.put_resolved(b"k", b"{}").unwrap();
        }
        let store = LedgerStore::open(&path).unwrap();
        assert_eq!(store.get_resolved(b"", b"k").unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_open_existing_does_not_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never-imported.redb");

        let err = LedgerStore::open_existing(&path).err().unwrap();
        assert_eq!(err.code(), StoreErrorCode::OpenFailed);
        assert!(!path.exists());
    }

    #[test]
    fn test_open_existing_reads_imported_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.redb");
        {
            let store = LedgerStore::open(&path).unwrap();
            store.put_register(&storage_key(&[0x01], b"a"), b"v").unwrap();
        }
        let store = LedgerStore::open_existing(&path).unwrap();
        assert_eq!(store.get_register(&[0x01], b"a").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = LedgerStore::open(&dir.path().join("missing").join("ledger.redb"))
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }
}
