//! Logical values materialized from slabs
//!
//! A stored value is `00 CA DE ‖ u16 version ‖ CBOR storable`. Storables use
//! plain CBOR for primitives and the tags below for everything else.

use std::fmt;

use ciborium::value::Value;
use serde::{Serialize, Serializer};
use serde_json::json;

use super::errors::{ResolveError, ResolveResult};
use super::id::Address;
use super::slab::write_cbor;

/// Prefix of every stored value
pub const STORED_VALUE_MAGIC: [u8; 3] = [0x00, 0xCA, 0xDE];

/// Highest stored-value version this decoder understands
pub const STORED_VALUE_VERSION: u16 = 1;

/// Void value, content ignored
pub const TAG_VOID: u64 = 128;
/// Optional with a value: the wrapped storable
pub const TAG_SOME: u64 = 130;
/// Address: byte string
pub const TAG_ADDRESS: u64 = 131;
/// Composite type info: `[location, qualified identifier, kind]`
pub const TAG_COMPOSITE_TYPE: u64 = 132;
/// Path: `[domain, identifier]`
pub const TAG_PATH: u64 = 216;
/// Sized integer tags; the content is a CBOR integer
pub const TAG_INT_FIRST: u64 = 152;
pub const TAG_INT_LAST: u64 = 175;

/// A fully materialized structured value
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalValue {
    Nil,
    Void,
    Bool(bool),
    Int(i128),
    String(String),
    Bytes(Vec<u8>),
    Address(Address),
    Path {
        domain: String,
        identifier: String,
    },
    Some(Box<LogicalValue>),
    Array(Vec<LogicalValue>),
    Dictionary(Vec<(LogicalValue, LogicalValue)>),
    Composite {
        type_id: String,
        kind: String,
        fields: Vec<(String, LogicalValue)>,
    },
}

impl LogicalValue {
    /// JSON rendering: `{"type": ..., "value": ...}` per value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LogicalValue::Nil => json!({ "type": "Optional", "value": null }),
            LogicalValue::Void => json!({ "type": "Void" }),
            LogicalValue::Bool(b) => json!({ "type": "Bool", "value": b }),
            LogicalValue::Int(i) => json!({ "type": "Int", "value": i.to_string() }),
            LogicalValue::String(s) => json!({ "type": "String", "value": s }),
            LogicalValue::Bytes(b) => json!({ "type": "Bytes", "value": hex::encode(b) }),
            LogicalValue::Address(a) => json!({ "type": "Address", "value": a.to_string() }),
            LogicalValue::Path { domain, identifier } => json!({
                "type": "Path",
                "value": { "domain": domain, "identifier": identifier }
            }),
            LogicalValue::Some(inner) => json!({ "type": "Optional", "value": inner.to_json() }),
            LogicalValue::Array(items) => json!({
                "type": "Array",
                "value": items.iter().map(|v| v.to_json()).collect::<Vec<_>>()
            }),
            LogicalValue::Dictionary(entries) => json!({
                "type": "Dictionary",
                "value": entries
                    .iter()
                    .map(|(k, v)| json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect::<Vec<_>>()
            }),
            LogicalValue::Composite {
                type_id,
                kind,
                fields,
            } => json!({
                "type": kind,
                "value": {
                    "id": type_id,
                    "fields": fields
                        .iter()
                        .map(|(name, v)| json!({ "name": name, "value": v.to_json() }))
                        .collect::<Vec<_>>()
                }
            }),
        }
    }

    /// Decodes a primitive storable. Containers and slab references are
    /// handled by the resolver; they are `Unsupported` here.
    pub fn from_primitive(value: &Value) -> ResolveResult<Self> {
        match value {
            Value::Null => Ok(LogicalValue::Nil),
            Value::Bool(b) => Ok(LogicalValue::Bool(*b)),
            Value::Integer(i) => Ok(LogicalValue::Int(i128::from(*i))),
            Value::Text(s) => Ok(LogicalValue::String(s.clone())),
            Value::Bytes(b) => Ok(LogicalValue::Bytes(b.clone())),
            Value::Tag(TAG_VOID, _) => Ok(LogicalValue::Void),
            Value::Tag(TAG_ADDRESS, inner) => match inner.as_ref() {
                Value::Bytes(b) => Ok(LogicalValue::Address(Address::from_owner_bytes(b))),
                other => Err(ResolveError::Malformed(format!(
                    "address over {:?}",
                    other
                ))),
            },
            Value::Tag(TAG_PATH, inner) => match inner.as_ref() {
                Value::Array(parts) => match parts.as_slice() {
                    [Value::Text(domain), Value::Text(identifier)] => Ok(LogicalValue::Path {
                        domain: domain.clone(),
                        identifier: identifier.clone(),
                    }),
                    _ => Err(ResolveError::Malformed(format!(
                        "path with {} parts",
                        parts.len()
                    ))),
                },
                other => Err(ResolveError::Malformed(format!("path over {:?}", other))),
            },
            Value::Tag(tag, inner) if (TAG_INT_FIRST..=TAG_INT_LAST).contains(tag) => {
                match inner.as_ref() {
                    Value::Integer(i) => Ok(LogicalValue::Int(i128::from(*i))),
                    other => Err(ResolveError::Malformed(format!(
                        "integer tag {} over {:?}",
                        tag, other
                    ))),
                }
            }
            Value::Tag(tag, _) => Err(ResolveError::Unsupported(format!("CBOR tag {}", tag))),
            Value::Float(_) => Err(ResolveError::Unsupported("floating point".to_string())),
            Value::Map(_) => Err(ResolveError::Unsupported("inline CBOR map".to_string())),
            Value::Array(_) => Err(ResolveError::Unsupported("inline CBOR array".to_string())),
            other => Err(ResolveError::Unsupported(format!("{:?}", other))),
        }
    }
}

impl Serialize for LogicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for LogicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalValue::Nil => write!(f, "nil"),
            LogicalValue::Void => write!(f, "()"),
            LogicalValue::Bool(b) => write!(f, "{}", b),
            LogicalValue::Int(i) => write!(f, "{}", i),
            LogicalValue::String(s) => write!(f, "{:?}", s),
            LogicalValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            LogicalValue::Address(a) => write!(f, "{}", a),
            LogicalValue::Path { domain, identifier } => write!(f, "/{}/{}", domain, identifier),
            LogicalValue::Some(inner) => write!(f, "{}", inner),
            LogicalValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            LogicalValue::Dictionary(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            LogicalValue::Composite {
                type_id, fields, ..
            } => {
                write!(f, "{}(", type_id)?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Strips the stored-value prefix, returning the version and the storable bytes.
pub fn strip_magic(data: &[u8]) -> ResolveResult<(u16, &[u8])> {
    let prefix = STORED_VALUE_MAGIC.len() + 2;
    if data.len() < prefix || data[..STORED_VALUE_MAGIC.len()] != STORED_VALUE_MAGIC {
        return Err(ResolveError::Malformed(
            "stored value prefix missing".to_string(),
        ));
    }
    let version = u16::from_be_bytes([data[3], data[4]]);
    if version > STORED_VALUE_VERSION {
        return Err(ResolveError::Unsupported(format!(
            "stored value version {}",
            version
        )));
    }
    Ok((version, &data[prefix..]))
}

/// Encodes `storable` as a stored value of the current version.
pub fn stored_value_bytes(storable: &Value) -> ResolveResult<Vec<u8>> {
    let mut buf = STORED_VALUE_MAGIC.to_vec();
    buf.extend_from_slice(&STORED_VALUE_VERSION.to_be_bytes());
    write_cbor(&mut buf, storable)?;
    Ok(buf)
}

/// Composite type info for a map slab.
pub fn composite_type_info(location: &str, qualified_identifier: &str, kind: &str) -> Value {
    Value::Tag(
        TAG_COMPOSITE_TYPE,
        Box::new(Value::Array(vec![
            Value::Text(location.to_string()),
            Value::Text(qualified_identifier.to_string()),
            Value::Text(kind.to_string()),
        ])),
    )
}
