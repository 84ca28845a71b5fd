//! Slab storage
//!
//! Structured values in the object-storage namespace are persisted as
//! slabs: fixed-format units keyed by owner address and index, linked into
//! trees and chains for large values. This module decodes slabs and
//! materializes the logical value rooted at an object-storage register.

mod errors;
mod id;
mod resolver;
#[allow(clippy::module_inception)]
mod slab;
mod value;

pub use errors::{ResolveError, ResolveResult};
pub use id::{Address, SlabId, SlabIndex, ADDRESS_LENGTH, SLAB_ID_LENGTH};
pub use resolver::{SlabResolver, MAX_SLAB_DEPTH};
pub use slab::{as_slab_ref, slab_ref, ChildHeader, Slab, SlabBody, SlabKind, CBOR_TAG_SLAB_ID, SLAB_VERSION};
pub use value::{
    composite_type_info, strip_magic, stored_value_bytes, LogicalValue, STORED_VALUE_MAGIC,
    STORED_VALUE_VERSION, TAG_ADDRESS, TAG_COMPOSITE_TYPE, TAG_INT_FIRST, TAG_INT_LAST, TAG_PATH,
    TAG_SOME, TAG_VOID,
};
