//! Slab Resolution Tests
//!
//! Object-storage values spread over several slabs, stored in checkpoint
//! order where slabs come after the register that refers to them:
//! - resolve alone on a fresh store cannot see the slabs and skips
//! - import followed by resolve materializes the whole value
//! - resolved values are persisted only when configured
//! - the read adapter never writes

use std::fs;
use std::path::{Path, PathBuf};

use checkpoint_migrate::checkpoint::{CheckpointHeader, StorableNode};
use checkpoint_migrate::migration::{run_migration, MigrationMode, MigrationOptions};
use checkpoint_migrate::namespace;
use checkpoint_migrate::payload::{encode_payload, Key, Payload};
use checkpoint_migrate::slab::{
    composite_type_info, slab_ref, stored_value_bytes, Address, ChildHeader, LogicalValue,
    ResolveError, Slab, SlabId, SlabIndex, SlabResolver,
};
use checkpoint_migrate::store::{
    LedgerReader, LedgerStore, MemoryRegisters, SlabRead, SlabWrite, REGISTERS, RESOLVED,
};
use ciborium::value::Value;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const OWNER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 0x2A];

fn id(index: u64) -> SlabId {
    SlabId::new(Address(OWNER), SlabIndex::from_u64(index))
}

/// A vault resource whose `history` field is a two-leaf array.
fn vault_registers() -> MemoryRegisters {
    let mut regs = MemoryRegisters::new();

    regs.store_slab(&Slab::map(
        id(1),
        composite_type_info("A.000000000000002a", "Vault", "Resource"),
        vec![
            (
                Value::Text("balance".into()),
                Value::Tag(164, Box::new(Value::Integer(250.into()))),
            ),
            (Value::Text("history".into()), slab_ref(id(2))),
        ],
    )).unwrap();
    regs.store_slab(&Slab::array_meta(
        id(2),
        Value::Null,
        vec![
            ChildHeader {
                id: id(3),
                count: 2,
                size: 0,
            },
            ChildHeader {
                id: id(4),
                count: 1,
                size: 0,
            },
        ],
    )).unwrap();
    regs.store_slab(&Slab::array_leaf(
        id(3),
        vec![Value::Integer(100.into()), Value::Integer(100.into())],
        Some(id(4)),
    )).unwrap();
    regs.store_slab(&Slab::array_leaf(id(4), vec![Value::Integer(50.into())], None)).unwrap();

    regs.set_value(
        &OWNER,
        b"storage\x1fvault",
        stored_value_bytes(&slab_ref(id(1))).unwrap(),
    )
    .unwrap();
    regs
}

fn expected_vault() -> LogicalValue {
    LogicalValue::Composite {
        type_id: "A.000000000000002a.Vault".to_string(),
        kind: "Resource".to_string(),
        fields: vec![
            ("balance".to_string(), LogicalValue::Int(250)),
            (
                "history".to_string(),
                LogicalValue::Array(vec![
                    LogicalValue::Int(100),
                    LogicalValue::Int(100),
                    LogicalValue::Int(50),
                ]),
            ),
        ],
    }
}

/// Checkpoint with the root register first and slab registers after it.
fn write_checkpoint(dir: &Path, regs: &MemoryRegisters) -> PathBuf {
    let mut entries: Vec<(Vec<u8>, Vec<u8>, Vec<u8>)> = regs
        .entries()
        .map(|(full_key, value)| {
            let (owner, path) = full_key.split_at(OWNER.len());
            (owner.to_vec(), path.to_vec(), value.to_vec())
        })
        .collect();
    entries.sort_by_key(|(_, path, _)| namespace::is_slab_key(path));

    let mut bytes = CheckpointHeader::new(entries.len() as u64 + 1)
        .serialize()
        .to_vec();
    bytes.extend_from_slice(&StorableNode::interior(1, 0, 0).serialize());
    for (owner, path, value) in entries {
        let payload = Payload::new(Key::register(&owner, b"", &path), value);
        bytes.extend_from_slice(&StorableNode::leaf(path, encode_payload(&payload)).serialize());
    }

    let path = dir.join("root.checkpoint");
    fs::write(&path, bytes).unwrap();
    path
}

// =============================================================================
// Two-Phase Migration
// =============================================================================

#[test]
fn test_resolve_alone_skips_slab_backed_value() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(temp.path(), &vault_registers());
    let store_path = temp.path().join("ledger.redb");

    let report = run_migration(
        &checkpoint,
        &store_path,
        &MigrationOptions::new(MigrationMode::Resolve),
    )
    .unwrap();

    assert!(report.is_completed());
    assert_eq!(report.stats.values_resolved, 0);
    assert_eq!(report.stats.resolve_failures, 1);
    // Slab registers are plain paths and are written raw
    assert_eq!(report.stats.registers_written, 4);
}

#[test]
fn test_import_then_resolve_materializes_value() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(temp.path(), &vault_registers());
    let store_path = temp.path().join("ledger.redb");

    let import = run_migration(
        &checkpoint,
        &store_path,
        &MigrationOptions::new(MigrationMode::Import),
    )
    .unwrap();
    assert_eq!(import.stats.registers_written, 5);
    assert_eq!(import.stats.pathless, 1);

    let mut options = MigrationOptions::new(MigrationMode::Resolve);
    options.persist_resolved = true;
    let resolve = run_migration(&checkpoint, &store_path, &options).unwrap();
    assert_eq!(resolve.stats.values_resolved, 1);
    assert_eq!(resolve.stats.resolved_persisted, 1);
    assert_eq!(resolve.stats.resolve_failures, 0);

    let store = LedgerStore::open(&store_path).unwrap();
    let reader = LedgerReader::new(&store);
    let value = SlabResolver::new(&reader)
        .read_value(&OWNER, b"storage\x1fvault")
        .unwrap();
    assert_eq!(value, expected_vault());

    let json = store
        .get_resolved(&OWNER, b"storage\x1fvault")
        .unwrap()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(json, expected_vault().to_json());
    assert_eq!(store.count(RESOLVED).unwrap(), 1);
}

#[test]
fn test_resolved_not_persisted_by_default() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(temp.path(), &vault_registers());
    let store_path = temp.path().join("ledger.redb");

    run_migration(
        &checkpoint,
        &store_path,
        &MigrationOptions::new(MigrationMode::Import),
    )
    .unwrap();
    let resolve = run_migration(
        &checkpoint,
        &store_path,
        &MigrationOptions::new(MigrationMode::Resolve),
    )
    .unwrap();

    assert_eq!(resolve.stats.values_resolved, 1);
    assert_eq!(resolve.stats.resolved_persisted, 0);
    let store = LedgerStore::open(&store_path).unwrap();
    assert_eq!(store.count(RESOLVED).unwrap(), 0);
}

// =============================================================================
// Storage Adapter
// =============================================================================

#[test]
fn test_adapter_reads_are_side_effect_free() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(temp.path(), &vault_registers());
    let store_path = temp.path().join("ledger.redb");
    run_migration(
        &checkpoint,
        &store_path,
        &MigrationOptions::new(MigrationMode::Import),
    )
    .unwrap();

    let store = LedgerStore::open(&store_path).unwrap();
    let before = store.entries(REGISTERS).unwrap();

    let reader = LedgerReader::new(&store);
    let slab_key = namespace::slab_key(&SlabIndex::from_u64(3));
    assert!(reader.value_exists(&OWNER, &slab_key));
    assert!(!reader.value_exists(&OWNER, &namespace::slab_key(&SlabIndex::from_u64(99))));
    assert_eq!(reader.get_value(&OWNER, b"storage\x1fnothing").unwrap(), None);
    SlabResolver::new(&reader)
        .read_value(&OWNER, b"storage\x1fvault")
        .unwrap();

    assert_eq!(store.entries(REGISTERS).unwrap(), before);
}

#[test]
fn test_missing_leaf_is_slab_not_found() {
    let temp = TempDir::new().unwrap();
    let store = LedgerStore::open(&temp.path().join("ledger.redb")).unwrap();

    for (full_key, value) in vault_registers().entries() {
        if full_key.ends_with(&namespace::slab_key(&SlabIndex::from_u64(4))) {
            continue;
        }
        store.put_register(full_key, value).unwrap();
    }

    let reader = LedgerReader::new(&store);
    let err = SlabResolver::new(&reader)
        .read_value(&OWNER, b"storage\x1fvault")
        .unwrap_err();
    assert!(matches!(err, ResolveError::SlabNotFound(missing) if missing == id(4)));
    assert_eq!(err.code(), "MIGRATE_RESOLVE_SLAB_NOT_FOUND");
}
