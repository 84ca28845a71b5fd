//! checkpoint-migrate - Ledger checkpoint to key-value store migration
//!
//! Reads a trie checkpoint node by node, decodes each register payload and
//! writes it into a redb store. Registers in the object-storage namespace
//! are materialized through their slabs into whole logical values.

pub mod checkpoint;
pub mod cli;
pub mod error;
pub mod migration;
pub mod namespace;
pub mod observability;
pub mod payload;
pub mod slab;
pub mod store;
