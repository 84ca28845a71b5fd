//! Slab resolver
//!
//! Materializes the logical value stored under an object-storage register.
//! The register holds a stored value whose root storable is either inline
//! or a reference to a root slab. Array and map slabs are either a single
//! data slab or a meta slab over children; leaves of one collection are
//! chained through their `next` link and walked in order.
//!
//! Resolution is read-only and bounded: every slab is loaded at most once
//! per value, and nesting deeper than `max_depth` fails.

use std::collections::HashSet;

use ciborium::value::Value;

use crate::namespace;
use crate::store::SlabRead;

use super::errors::{ResolveError, ResolveResult};
use super::id::SlabId;
use super::slab::{as_slab_ref, read_cbor, Slab, SlabBody, SlabKind};
use super::value::{strip_magic, LogicalValue, TAG_COMPOSITE_TYPE, TAG_SOME};

/// Default nesting limit for slab references
pub const MAX_SLAB_DEPTH: usize = 64;

/// Resolves object-storage values through a read-only slab source
pub struct SlabResolver<'a, S: SlabRead + ?Sized> {
    storage: &'a S,
    max_depth: usize,
}

/// Per-value traversal state
struct Walk {
    visited: HashSet<SlabId>,
}

impl<'a, S: SlabRead + ?Sized> SlabResolver<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            max_depth: MAX_SLAB_DEPTH,
        }
    }

    pub fn with_max_depth(storage: &'a S, max_depth: usize) -> Self {
        Self { storage, max_depth }
    }

    /// Reads and materializes the value stored under `owner ‖ key`.
    pub fn read_value(&self, owner: &[u8], key: &[u8]) -> ResolveResult<LogicalValue> {
        let data = self.storage.get_value(owner, key)?.ok_or_else(|| {
            ResolveError::NotFound(format!(
                "0x{}/{}",
                hex::encode(owner),
                String::from_utf8_lossy(key)
            ))
        })?;

        let (_version, mut rest) = strip_magic(&data)?;
        let storable = read_cbor(&mut rest, "root storable")?;
        if !rest.is_empty() {
            return Err(ResolveError::Malformed(format!(
                "{} trailing bytes after root storable",
                rest.len()
            )));
        }

        self.stored_value(&storable)
    }

    /// Decodes one slab.
    pub fn decode_slab(&self, id: SlabId, bytes: &[u8]) -> ResolveResult<Slab> {
        Slab::decode(id, bytes)
    }

    /// Materializes a storable, following slab references.
    pub fn stored_value(&self, storable: &Value) -> ResolveResult<LogicalValue> {
        let mut walk = Walk {
            visited: HashSet::new(),
        };
        self.materialize(storable, &mut walk, 0)
    }

    fn materialize(
        &self,
        storable: &Value,
        walk: &mut Walk,
        depth: usize,
    ) -> ResolveResult<LogicalValue> {
        if let Some(id) = as_slab_ref(storable) {
            return self.resolve_slab(id?, walk, depth + 1);
        }
        match storable {
            Value::Tag(TAG_SOME, inner) => Ok(LogicalValue::Some(Box::new(
                self.materialize(inner, walk, depth)?,
            ))),
            _ => LogicalValue::from_primitive(storable),
        }
    }

    fn load_slab(&self, id: SlabId, walk: &mut Walk, depth: usize) -> ResolveResult<Slab> {
        if depth > self.max_depth {
            return Err(ResolveError::DepthExceeded(self.max_depth));
        }
        if !walk.visited.insert(id) {
            return Err(ResolveError::CycleDetected(id));
        }

        let key = namespace::slab_key(&id.index);
        let bytes = self
            .storage
            .get_value(&id.address.0, &key)?
            .ok_or(ResolveError::SlabNotFound(id))?;

        self.decode_slab(id, &bytes)
    }

    fn resolve_slab(
        &self,
        id: SlabId,
        walk: &mut Walk,
        depth: usize,
    ) -> ResolveResult<LogicalValue> {
        let slab = self.load_slab(id, walk, depth)?;
        if !slab.root {
            return Err(ResolveError::Malformed(format!(
                "slab {} referenced as a value but is not a root slab",
                id
            )));
        }

        if let SlabBody::Storable(value) = &slab.body {
            return self.materialize(value, walk, depth);
        }

        let is_map = matches!(slab.kind(), SlabKind::MapData | SlabKind::MapMeta);
        let type_info = slab.type_info.clone();
        let leaves = self.collect_leaves(slab, walk, depth, is_map)?;

        if is_map {
            let mut entries = Vec::new();
            for body in leaves {
                if let SlabBody::MapData(pairs) = body {
                    for (k, v) in pairs {
                        let value = self.materialize(&v, walk, depth)?;
                        entries.push((k, value));
                    }
                }
            }
            self.build_map(type_info, entries, walk, depth)
        } else {
            let mut items = Vec::new();
            for body in leaves {
                if let SlabBody::ArrayData(elements) = body {
                    for element in &elements {
                        items.push(self.materialize(element, walk, depth)?);
                    }
                }
            }
            Ok(LogicalValue::Array(items))
        }
    }

    /// Data slab bodies of one collection, in order.
    fn collect_leaves(
        &self,
        root: Slab,
        walk: &mut Walk,
        depth: usize,
        is_map: bool,
    ) -> ResolveResult<Vec<SlabBody>> {
        let expected_kind = if is_map {
            SlabKind::MapData
        } else {
            SlabKind::ArrayData
        };

        let expected_count: u64 = match &root.body {
            SlabBody::ArrayMeta(children) | SlabBody::MapMeta(children) => {
                children.iter().map(|c| c.count as u64).sum()
            }
            _ => return Ok(vec![root.body]),
        };

        // Descend along first children to the leftmost leaf.
        let mut current = root;
        let mut level = depth;
        let first_leaf = loop {
            let first = match &current.body {
                SlabBody::ArrayMeta(children) | SlabBody::MapMeta(children) => {
                    Some(children.first().map(|c| c.id).ok_or_else(|| {
                        ResolveError::Malformed(format!("meta slab {} has no children", current.id))
                    })?)
                }
                _ => None,
            };
            match first {
                Some(first) => {
                    level += 1;
                    current = self.load_slab(first, walk, level)?;
                }
                None => break current,
            }
        };

        let mut leaves = Vec::new();
        let mut next = Some(first_leaf);
        while let Some(leaf) = next.take() {
            if leaf.kind() != expected_kind {
                return Err(ResolveError::Malformed(format!(
                    "slab {} is {:?} inside a {:?} collection",
                    leaf.id,
                    leaf.kind(),
                    expected_kind
                )));
            }
            if let Some(next_id) = leaf.next {
                next = Some(self.load_slab(next_id, walk, level)?);
            }
            leaves.push(leaf.body);
        }

        let actual: u64 = leaves
            .iter()
            .map(|body| match body {
                SlabBody::ArrayData(items) => items.len() as u64,
                SlabBody::MapData(pairs) => pairs.len() as u64,
                _ => 0,
            })
            .sum();
        if actual != expected_count {
            return Err(ResolveError::Malformed(format!(
                "collection holds {} elements, meta slab counts {}",
                actual, expected_count
            )));
        }

        Ok(leaves)
    }

    fn build_map(
        &self,
        type_info: Option<Value>,
        entries: Vec<(Value, LogicalValue)>,
        walk: &mut Walk,
        depth: usize,
    ) -> ResolveResult<LogicalValue> {
        if let Some(Value::Tag(TAG_COMPOSITE_TYPE, info)) = type_info {
            let (type_id, kind) = match info.as_ref() {
                Value::Array(parts) => match parts.as_slice() {
                    [Value::Text(location), Value::Text(identifier), Value::Text(kind)] => {
                        (format!("{}.{}", location, identifier), kind.clone())
                    }
                    _ => {
                        return Err(ResolveError::Malformed(
                            "composite type info is not [location, identifier, kind]".to_string(),
                        ))
                    }
                },
                other => {
                    return Err(ResolveError::Malformed(format!(
                        "composite type info over {:?}",
                        other
                    )))
                }
            };

            let mut fields = Vec::with_capacity(entries.len());
            for (name, value) in entries {
                match name {
                    Value::Text(name) => fields.push((name, value)),
                    other => {
                        return Err(ResolveError::Malformed(format!(
                            "composite field name {:?}",
                            other
                        )))
                    }
                }
            }
            return Ok(LogicalValue::Composite {
                type_id,
                kind,
                fields,
            });
        }

        let mut dictionary = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            dictionary.push((self.materialize(&key, walk, depth)?, value));
        }
        Ok(LogicalValue::Dictionary(dictionary))
    }
}
