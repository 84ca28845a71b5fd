//! Output store
//!
//! redb-backed sink for imported registers and resolved values, plus the
//! read-side adapter the slab resolver consumes.

mod adapter;
mod engine;
mod errors;

pub use adapter::{LedgerReader, MemoryRegisters, RegisterSink, SlabRead, SlabWrite};
pub use engine::{storage_key, LedgerStore, REGISTERS, RESOLVED};
pub use errors::{StoreError, StoreErrorCode, StoreResult};
