//! Slab encoding
//!
//! ```text
//! +----------------------+
//! | Version              | (u8, 0)
//! +----------------------+
//! | Flag                 | (u8: 0x80 root, 0x40 has pointers, low 5 bits kind)
//! +----------------------+
//! | Type info            | (one CBOR item; root array/map slabs only)
//! +----------------------+
//! | Next slab id         | (16 bytes, all-zero = none; non-root data slabs only)
//! +----------------------+
//! | Body                 |
//! |   array data: CBOR array of storables
//! |   map data:   CBOR array of [key, value] pairs
//! |   meta:       u16 BE child count, then per child
//! |               16-byte slab id, u32 BE element count, u32 BE byte size
//! |   storable:   one CBOR storable
//! +----------------------+
//! ```
//!
//! A storable that refers to another slab is CBOR tag 255 over the 16-byte
//! slab id.

use ciborium::value::Value;

use super::errors::{ResolveError, ResolveResult};
use super::id::{SlabId, SLAB_ID_LENGTH};

/// Current slab encoding version
pub const SLAB_VERSION: u8 = 0;

/// CBOR tag of a storable that references another slab
pub const CBOR_TAG_SLAB_ID: u64 = 255;

const FLAG_ROOT: u8 = 0x80;
const FLAG_HAS_POINTERS: u8 = 0x40;
const KIND_MASK: u8 = 0x1F;

/// Slab kind, from the low bits of the flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlabKind {
    ArrayData,
    ArrayMeta,
    MapData,
    MapMeta,
    Storable,
}

impl SlabKind {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 => Some(SlabKind::ArrayData),
            0x01 => Some(SlabKind::ArrayMeta),
            0x08 => Some(SlabKind::MapData),
            0x09 => Some(SlabKind::MapMeta),
            0x1F => Some(SlabKind::Storable),
            _ => None,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            SlabKind::ArrayData => 0x00,
            SlabKind::ArrayMeta => 0x01,
            SlabKind::MapData => 0x08,
            SlabKind::MapMeta => 0x09,
            SlabKind::Storable => 0x1F,
        }
    }

    fn is_data(&self) -> bool {
        matches!(self, SlabKind::ArrayData | SlabKind::MapData)
    }
}

/// Child entry of a meta slab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildHeader {
    pub id: SlabId,
    /// Elements below this child
    pub count: u32,
    /// Encoded size below this child
    pub size: u32,
}

/// Decoded slab contents
#[derive(Debug, Clone, PartialEq)]
pub enum SlabBody {
    ArrayData(Vec<Value>),
    ArrayMeta(Vec<ChildHeader>),
    MapData(Vec<(Value, Value)>),
    MapMeta(Vec<ChildHeader>),
    Storable(Value),
}

impl SlabBody {
    fn kind(&self) -> SlabKind {
        match self {
            SlabBody::ArrayData(_) => SlabKind::ArrayData,
            SlabBody::ArrayMeta(_) => SlabKind::ArrayMeta,
            SlabBody::MapData(_) => SlabKind::MapData,
            SlabBody::MapMeta(_) => SlabKind::MapMeta,
            SlabBody::Storable(_) => SlabKind::Storable,
        }
    }
}

/// One decoded slab
#[derive(Debug, Clone, PartialEq)]
pub struct Slab {
    pub id: SlabId,
    pub root: bool,
    /// Type info of the collection; root array/map slabs only
    pub type_info: Option<Value>,
    /// Next data slab at the same level; non-root data slabs only
    pub next: Option<SlabId>,
    pub body: SlabBody,
}

impl Slab {
    /// Root slab holding a single storable.
    pub fn storable(id: SlabId, value: Value) -> Self {
        Self::build(id, true, None, None, SlabBody::Storable(value))
    }

    /// Root array data slab.
    pub fn array(id: SlabId, type_info: Value, elements: Vec<Value>) -> Self {
        Self::build(id, true, Some(type_info), None, SlabBody::ArrayData(elements))
    }

    /// Root map data slab.
    pub fn map(id: SlabId, type_info: Value, entries: Vec<(Value, Value)>) -> Self {
        Self::build(id, true, Some(type_info), None, SlabBody::MapData(entries))
    }

    /// Root array meta slab over `children`.
    pub fn array_meta(id: SlabId, type_info: Value, children: Vec<ChildHeader>) -> Self {
        Self::build(id, true, Some(type_info), None, SlabBody::ArrayMeta(children))
    }

    /// Root map meta slab over `children`.
    pub fn map_meta(id: SlabId, type_info: Value, children: Vec<ChildHeader>) -> Self {
        Self::build(id, true, Some(type_info), None, SlabBody::MapMeta(children))
    }

    /// Non-root array data slab linked to `next`.
    pub fn array_leaf(id: SlabId, elements: Vec<Value>, next: Option<SlabId>) -> Self {
        Self::build(id, false, None, next, SlabBody::ArrayData(elements))
    }

    /// Non-root map data slab linked to `next`.
    pub fn map_leaf(id: SlabId, entries: Vec<(Value, Value)>, next: Option<SlabId>) -> Self {
        Self::build(id, false, None, next, SlabBody::MapData(entries))
    }

    fn build(
        id: SlabId,
        root: bool,
        type_info: Option<Value>,
        next: Option<SlabId>,
        body: SlabBody,
    ) -> Self {
        Self {
            id,
            root,
            type_info,
            next,
            body,
        }
    }

    /// Slab kind
    pub fn kind(&self) -> SlabKind {
        self.body.kind()
    }

    /// Whether any element refers to another slab.
    pub fn has_pointers(&self) -> bool {
        match &self.body {
            SlabBody::ArrayData(items) => items.iter().any(contains_slab_ref),
            SlabBody::MapData(entries) => entries
                .iter()
                .any(|(k, v)| contains_slab_ref(k) || contains_slab_ref(v)),
            SlabBody::ArrayMeta(_) | SlabBody::MapMeta(_) => true,
            SlabBody::Storable(value) => contains_slab_ref(value),
        }
    }

    /// Decodes a slab stored under `id`.
    pub fn decode(id: SlabId, data: &[u8]) -> ResolveResult<Self> {
        if data.len() < 2 {
            return Err(ResolveError::Malformed(format!(
                "slab {} is {} bytes, header needs 2",
                id,
                data.len()
            )));
        }
        if data[0] != SLAB_VERSION {
            return Err(ResolveError::Unsupported(format!(
                "slab {} has encoding version {}",
                id, data[0]
            )));
        }

        let flag = data[1];
        let root = flag & FLAG_ROOT != 0;
        let kind = SlabKind::from_bits(flag & KIND_MASK).ok_or_else(|| {
            ResolveError::Unsupported(format!("slab {} has kind bits {:#04x}", id, flag & KIND_MASK))
        })?;

        let mut rest = &data[2..];

        let type_info = if root && kind != SlabKind::Storable {
            Some(read_cbor(&mut rest, "slab type info")?)
        } else {
            None
        };

        let next = if kind.is_data() && !root {
            let bytes = take(&mut rest, SLAB_ID_LENGTH, "next slab id")?;
            SlabId::from_bytes(bytes).filter(|next| !next.is_undefined())
        } else {
            None
        };

        let body = match kind {
            SlabKind::ArrayData => SlabBody::ArrayData(read_array(&mut rest, "array elements")?),
            SlabKind::MapData => {
                let pairs = read_array(&mut rest, "map elements")?;
                let mut entries = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    entries.push(into_pair(pair)?);
                }
                SlabBody::MapData(entries)
            }
            SlabKind::ArrayMeta => SlabBody::ArrayMeta(read_children(&mut rest)?),
            SlabKind::MapMeta => SlabBody::MapMeta(read_children(&mut rest)?),
            SlabKind::Storable => SlabBody::Storable(read_cbor(&mut rest, "storable")?),
        };

        if !rest.is_empty() {
            return Err(ResolveError::Malformed(format!(
                "slab {} has {} trailing bytes",
                id,
                rest.len()
            )));
        }

        Ok(Self {
            id,
            root,
            type_info,
            next,
            body,
        })
    }

    /// Serializes the slab.
    pub fn serialize(&self) -> ResolveResult<Vec<u8>> {
        let kind = self.kind();
        let mut flag = kind.bits();
        if self.root {
            flag |= FLAG_ROOT;
        }
        if self.has_pointers() {
            flag |= FLAG_HAS_POINTERS;
        }

        let mut buf = vec![SLAB_VERSION, flag];

        if self.root && kind != SlabKind::Storable {
            write_cbor(&mut buf, self.type_info.as_ref().unwrap_or(&Value::Null))?;
        }
        if kind.is_data() && !self.root {
            match self.next {
                Some(next) => buf.extend_from_slice(&next.to_bytes()),
                None => buf.extend_from_slice(&[0u8; SLAB_ID_LENGTH]),
            }
        }

        match &self.body {
            SlabBody::ArrayData(items) => write_cbor(&mut buf, &Value::Array(items.clone()))?,
            SlabBody::MapData(entries) => {
                let pairs = entries
                    .iter()
                    .map(|(k, v)| Value::Array(vec![k.clone(), v.clone()]))
                    .collect();
                write_cbor(&mut buf, &Value::Array(pairs))?;
            }
            SlabBody::ArrayMeta(children) | SlabBody::MapMeta(children) => {
                buf.extend_from_slice(&(children.len() as u16).to_be_bytes());
                for child in children {
                    buf.extend_from_slice(&child.id.to_bytes());
                    buf.extend_from_slice(&child.count.to_be_bytes());
                    buf.extend_from_slice(&child.size.to_be_bytes());
                }
            }
            SlabBody::Storable(value) => write_cbor(&mut buf, value)?,
        }

        Ok(buf)
    }
}

/// Storable referring to slab `id`
pub fn slab_ref(id: SlabId) -> Value {
    Value::Tag(CBOR_TAG_SLAB_ID, Box::new(Value::Bytes(id.to_bytes().to_vec())))
}

/// The slab a storable refers to, if it is a reference.
pub fn as_slab_ref(value: &Value) -> Option<ResolveResult<SlabId>> {
    match value {
        Value::Tag(CBOR_TAG_SLAB_ID, inner) => Some(match inner.as_ref() {
            Value::Bytes(bytes) => SlabId::from_bytes(bytes).ok_or_else(|| {
                ResolveError::Malformed(format!("slab reference of {} bytes", bytes.len()))
            }),
            other => Err(ResolveError::Malformed(format!(
                "slab reference over {:?}",
                other
            ))),
        }),
        _ => None,
    }
}

fn contains_slab_ref(value: &Value) -> bool {
    match value {
        Value::Tag(CBOR_TAG_SLAB_ID, _) => true,
        Value::Tag(_, inner) => contains_slab_ref(inner),
        Value::Array(items) => items.iter().any(contains_slab_ref),
        _ => false,
    }
}

/// Decodes one CBOR item, advancing `rest` past it.
pub(crate) fn read_cbor(rest: &mut &[u8], context: &str) -> ResolveResult<Value> {
    ciborium::de::from_reader(&mut *rest).map_err(|e| ResolveError::malformed(context, e))
}

/// Appends one CBOR item to `buf`.
pub(crate) fn write_cbor(buf: &mut Vec<u8>, value: &Value) -> ResolveResult<()> {
    ciborium::ser::into_writer(value, &mut *buf).map_err(|e| ResolveError::Encode(e.to_string()))
}

fn read_array(rest: &mut &[u8], context: &str) -> ResolveResult<Vec<Value>> {
    match read_cbor(rest, context)? {
        Value::Array(items) => Ok(items),
        other => Err(ResolveError::Malformed(format!(
            "{}: expected array, found {:?}",
            context, other
        ))),
    }
}

fn into_pair(value: Value) -> ResolveResult<(Value, Value)> {
    match value {
        Value::Array(mut pair) if pair.len() == 2 => {
            let v = pair.pop().unwrap_or(Value::Null);
            let k = pair.pop().unwrap_or(Value::Null);
            Ok((k, v))
        }
        other => Err(ResolveError::Malformed(format!(
            "map element is not a [key, value] pair: {:?}",
            other
        ))),
    }
}

fn take<'a>(rest: &mut &'a [u8], len: usize, context: &str) -> ResolveResult<&'a [u8]> {
    if rest.len() < len {
        return Err(ResolveError::Malformed(format!(
            "{}: need {} bytes, have {}",
            context,
            len,
            rest.len()
        )));
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

fn read_children(rest: &mut &[u8]) -> ResolveResult<Vec<ChildHeader>> {
    let count_bytes = take(rest, 2, "child count")?;
    let count = u16::from_be_bytes([count_bytes[0], count_bytes[1]]);

    let mut children = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let entry = take(rest, SLAB_ID_LENGTH + 8, "child header")?;
        let id = SlabId::from_bytes(&entry[..SLAB_ID_LENGTH])
            .ok_or_else(|| ResolveError::Malformed("child slab id".to_string()))?;
        let count = u32::from_be_bytes([entry[16], entry[17], entry[18], entry[19]]);
        let size = u32::from_be_bytes([entry[20], entry[21], entry[22], entry[23]]);
        children.push(ChildHeader { id, count, size });
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slab::id::{Address, SlabIndex};

    fn id(index: u64) -> SlabId {
        SlabId::new(Address([0, 0, 0, 0, 0, 0, 0, 1]), SlabIndex::from_u64(index))
    }

    #[test]
    fn test_array_root_roundtrip() {
        let slab = Slab::array(
            id(1),
            Value::Text("[Int]".into()),
            vec![Value::Integer(1.into()), slab_ref(id(2))],
        );
        let bytes = slab.serialize().unwrap();
        assert_eq!(bytes[1] & FLAG_ROOT, FLAG_ROOT);
        assert_eq!(bytes[1] & FLAG_HAS_POINTERS, FLAG_HAS_POINTERS);
        assert_eq!(Slab::decode(id(1), &bytes).unwrap(), slab);
    }

    #[test]
    fn test_leaf_next_link() {
        let slab = Slab::map_leaf(
            id(3),
            vec![(Value::Text("a".into()), Value::Bool(true))],
            Some(id(4)),
        );
        let decoded = Slab::decode(id(3), &slab.serialize().unwrap()).unwrap();
        assert_eq!(decoded.next, Some(id(4)));
        assert!(decoded.type_info.is_none());

        let last = Slab::array_leaf(id(4), vec![], None);
        assert_eq!(Slab::decode(id(4), &last.serialize().unwrap()).unwrap().next, None);
    }

    #[test]
    fn test_meta_children() {
        let children = vec![
            ChildHeader { id: id(5), count: 2, size: 40 },
            ChildHeader { id: id(6), count: 1, size: 20 },
        ];
        let slab = Slab::array_meta(id(7), Value::Null, children.clone());
        let decoded = Slab::decode(id(7), &slab.serialize().unwrap()).unwrap();
        assert_eq!(decoded.body, SlabBody::ArrayMeta(children));
    }

    #[test]
    fn test_unknown_version_is_unsupported() {
        let mut bytes = Slab::storable(id(1), Value::Bool(true)).serialize().unwrap();
        bytes[0] = 3;
        assert!(matches!(
            Slab::decode(id(1), &bytes),
            Err(ResolveError::Unsupported(_))
        ));
    }

    #[test]
    fn test_truncated_and_trailing_are_malformed() {
        let bytes = Slab::storable(id(1), Value::Text("vault".into())).serialize().unwrap();
        assert!(matches!(
            Slab::decode(id(1), &bytes[..bytes.len() - 2]),
            Err(ResolveError::Malformed(_))
        ));

        let mut extra = bytes.clone();
        extra.push(0);
        assert!(matches!(
            Slab::decode(id(1), &extra),
            Err(ResolveError::Malformed(_))
        ));

        assert!(matches!(
            Slab::decode(id(1), &[SLAB_VERSION]),
            Err(ResolveError::Malformed(_))
        ));
    }

    #[test]
    fn test_as_slab_ref() {
        assert_eq!(as_slab_ref(&slab_ref(id(9))).unwrap().unwrap(), id(9));
        assert!(as_slab_ref(&Value::Integer(9.into())).is_none());
        let bad = Value::Tag(CBOR_TAG_SLAB_ID, Box::new(Value::Bytes(vec![1, 2])));
        assert!(as_slab_ref(&bad).unwrap().is_err());
    }
}
