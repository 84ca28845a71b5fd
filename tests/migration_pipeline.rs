//! Migration Pipeline Tests
//!
//! Properties of a full run over a checkpoint:
//! - exactly `node_count` records are consumed, trailing bytes untouched
//! - nodes without a path never reach the store
//! - plain registers round-trip through the store unchanged
//! - object-storage registers are resolved or skipped, never written raw
//! - re-running on a fresh store yields identical contents
//! - a truncated checkpoint aborts the run

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use checkpoint_migrate::checkpoint::{CheckpointHeader, CheckpointReader, StorableNode};
use checkpoint_migrate::migration::{
    run_migration, MigrationDriver, MigrationErrorCode, MigrationMode, MigrationOptions,
    TerminalState,
};
use checkpoint_migrate::payload::{encode_payload, Key, Payload};
use checkpoint_migrate::store::{LedgerStore, REGISTERS, RESOLVED};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const OWNER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0x0A, 0x01];

fn leaf(owner: &[u8], path: &[u8], value: &[u8]) -> StorableNode {
    let payload = Payload::new(Key::register(owner, b"", path), value.to_vec());
    StorableNode::leaf(path.to_vec(), encode_payload(&payload))
}

fn checkpoint_bytes(nodes: &[StorableNode]) -> Vec<u8> {
    let mut bytes = CheckpointHeader::new(nodes.len() as u64)
        .serialize()
        .to_vec();
    for node in nodes {
        bytes.extend_from_slice(&node.serialize());
    }
    bytes
}

fn write_checkpoint(dir: &Path, nodes: &[StorableNode]) -> PathBuf {
    let path = dir.join("root.checkpoint");
    fs::write(&path, checkpoint_bytes(nodes)).unwrap();
    path
}

fn resolve_options() -> MigrationOptions {
    MigrationOptions::new(MigrationMode::Resolve)
}

// =============================================================================
// Record Count
// =============================================================================

#[test]
fn test_consumes_exactly_node_count_records() {
    let nodes = vec![
        leaf(&OWNER, b"public\x1fa", b"\x01"),
        StorableNode::interior(1, 1, 1),
    ];
    let mut bytes = checkpoint_bytes(&nodes);
    let trailing = b"not a node record".to_vec();
    bytes.extend_from_slice(&trailing);

    let temp = TempDir::new().unwrap();
    let store = LedgerStore::open(&temp.path().join("ledger.redb")).unwrap();

    let mut cursor = Cursor::new(bytes);
    let report = {
        let reader = CheckpointReader::new(&mut cursor);
        MigrationDriver::new(&store, MigrationMode::Resolve).run(reader)
    };

    assert_eq!(report.state, TerminalState::Completed);
    assert_eq!(report.stats.nodes_processed, 2);

    let consumed = cursor.position() as usize;
    assert_eq!(&cursor.get_ref()[consumed..], trailing.as_slice());
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_three_pathless_nodes_complete_without_writes() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(
        temp.path(),
        &[
            StorableNode::interior(1, 0, 0),
            StorableNode::interior(1, 0, 0),
            StorableNode::interior(2, 1, 2),
        ],
    );
    let store_path = temp.path().join("ledger.redb");

    let report = run_migration(&checkpoint, &store_path, &resolve_options()).unwrap();

    assert_eq!(report.state, TerminalState::Completed);
    assert_eq!(report.stats.nodes_processed, 3);
    assert_eq!(report.stats.registers_written, 0);

    let store = LedgerStore::open(&store_path).unwrap();
    assert_eq!(store.count(REGISTERS).unwrap(), 0);
    assert_eq!(store.count(RESOLVED).unwrap(), 0);
}

#[test]
fn test_plain_register_round_trip() {
    let temp = TempDir::new().unwrap();
    let value = b"\x00\x00\x00\x00\x3b\x9a\xca\x00".to_vec();
    let checkpoint = write_checkpoint(
        temp.path(),
        &[leaf(&OWNER, b"public\x1fbalance", &value)],
    );
    let store_path = temp.path().join("ledger.redb");

    run_migration(&checkpoint, &store_path, &resolve_options()).unwrap();

    let store = LedgerStore::open(&store_path).unwrap();
    let mut key = OWNER.to_vec();
    key.extend_from_slice(b"public\x1fbalance");
    assert_eq!(store.entries(REGISTERS).unwrap(), vec![(key, value)]);
}

#[test]
fn test_storage_path_without_slab_is_skipped() {
    // Stored value referencing slab 0x0000000000000a01.7, which does not exist
    let mut root = b"\x00\xca\xde\x00\x01\xd8\xff\x50".to_vec();
    root.extend_from_slice(&OWNER);
    root.extend_from_slice(&7u64.to_be_bytes());

    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(
        temp.path(),
        &[
            leaf(&OWNER, b"storage\x1fflowTokenVault", &root),
            leaf(&OWNER, b"public\x1fbalance", b"\x05"),
        ],
    );
    let store_path = temp.path().join("ledger.redb");

    let report = run_migration(&checkpoint, &store_path, &resolve_options()).unwrap();

    assert_eq!(report.state, TerminalState::Completed);
    assert_eq!(report.stats.resolve_failures, 1);
    assert_eq!(report.stats.values_resolved, 0);
    assert_eq!(report.stats.registers_written, 1);

    let store = LedgerStore::open(&store_path).unwrap();
    assert_eq!(
        store
            .get_register(&OWNER, b"storage\x1fflowTokenVault")
            .unwrap(),
        None
    );
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_rerun_on_fresh_store_is_identical() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(
        temp.path(),
        &[
            leaf(&OWNER, b"public\x1fa", b"\x01"),
            StorableNode::interior(1, 0, 0),
            leaf(&[0x02], b"contract\x1fToken", b"pub contract Token {}"),
            leaf(&OWNER, b"storage\x1fmissing", b"\x00\xca\xde\x00\x01\xf6"),
        ],
    );

    let first_path = temp.path().join("first.redb");
    let second_path = temp.path().join("second.redb");
    let first = run_migration(&checkpoint, &first_path, &resolve_options()).unwrap();
    let second = run_migration(&checkpoint, &second_path, &resolve_options()).unwrap();

    assert_eq!(first.stats, second.stats);
    assert_ne!(first.stats.write_digest, 0);

    let first_entries = LedgerStore::open(&first_path)
        .unwrap()
        .entries(REGISTERS)
        .unwrap();
    let second_entries = LedgerStore::open(&second_path)
        .unwrap()
        .entries(REGISTERS)
        .unwrap();
    assert_eq!(first_entries, second_entries);
    assert_eq!(first_entries.len(), 2);
}

// =============================================================================
// Fatal Conditions
// =============================================================================

#[test]
fn test_truncated_checkpoint_aborts() {
    let temp = TempDir::new().unwrap();
    let mut bytes = checkpoint_bytes(&[
        leaf(&OWNER, b"public\x1fa", b"\x01"),
        leaf(&OWNER, b"public\x1fb", b"\x02"),
    ]);
    bytes.truncate(bytes.len() - 3);
    let checkpoint = temp.path().join("root.checkpoint");
    fs::write(&checkpoint, bytes).unwrap();

    let report = run_migration(
        &checkpoint,
        &temp.path().join("ledger.redb"),
        &resolve_options(),
    )
    .unwrap();

    assert_eq!(report.state, TerminalState::Aborted);
    assert_eq!(report.stats.nodes_processed, 1);
    assert_eq!(report.aborted_at, Some(2));

    let err = report.into_result().unwrap_err();
    assert_eq!(err.code(), MigrationErrorCode::Aborted);
    assert_eq!(err.node_index(), Some(2));
}

#[test]
fn test_missing_checkpoint_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let err = run_migration(
        &temp.path().join("absent.checkpoint"),
        &temp.path().join("ledger.redb"),
        &MigrationOptions::new(MigrationMode::Import),
    )
    .unwrap_err();
    assert_eq!(err.code(), MigrationErrorCode::CheckpointUnavailable);
}

#[test]
fn test_unopenable_store_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let checkpoint = write_checkpoint(temp.path(), &[]);
    let err = run_migration(
        &checkpoint,
        &temp.path().join("no-such-dir").join("ledger.redb"),
        &resolve_options(),
    )
    .unwrap_err();
    assert_eq!(err.code(), MigrationErrorCode::StoreUnavailable);
}
