//! Encoded payload format
//!
//! ```text
//! +----------------------+
//! | Encoding version     | (u16 BE)
//! +----------------------+
//! | Encoding type        | (u8, 6 = payload)
//! +----------------------+
//! | Key length           | (u32 BE)
//! | Key                  |
//! |   Part count         | (u16 BE)
//! |   per part:          |
//! |     Part length      | (u32 BE, covers type + value)
//! |     Part type        | (u16 BE)
//! |     Part value       |
//! +----------------------+
//! | Value length         | (u32 BE for version 0, u64 BE from version 1)
//! | Value                |
//! +----------------------+
//! ```

use super::errors::{PayloadError, PayloadResult};
use super::key::{Key, KeyPart, Payload};

/// Latest payload encoding version
pub const PAYLOAD_ENCODING_VERSION: u16 = 1;

/// Encoding type tag for payloads
pub const TYPE_PAYLOAD: u8 = 6;

/// Decodes an encoded payload.
pub fn decode_payload(encoded: &[u8]) -> PayloadResult<Payload> {
    if encoded.is_empty() {
        return Err(PayloadError::Empty);
    }

    let mut cursor = SliceCursor::new(encoded);

    let version = cursor.read_u16("encoding version")?;
    if version > PAYLOAD_ENCODING_VERSION {
        return Err(PayloadError::UnsupportedVersion(version));
    }

    let kind = cursor.read_u8("encoding type")?;
    if kind != TYPE_PAYLOAD {
        return Err(PayloadError::WrongType {
            found: kind,
            expected: TYPE_PAYLOAD,
        });
    }

    let key_len = cursor.read_u32("key length")? as usize;
    let key = decode_key(cursor.take(key_len, "key")?)?;

    let value_len = if version == 0 {
        cursor.read_u32("value length")? as u64
    } else {
        cursor.read_u64("value length")?
    };
    let value_len = usize::try_from(value_len).map_err(|_| PayloadError::Truncated("value"))?;
    let value = cursor.take(value_len, "value")?.to_vec();

    if !cursor.is_empty() {
        return Err(PayloadError::TrailingBytes("payload", cursor.remaining()));
    }

    Ok(Payload::new(key, value))
}

fn decode_key(encoded: &[u8]) -> PayloadResult<Key> {
    let mut cursor = SliceCursor::new(encoded);
    let count = cursor.read_u16("key part count")?;

    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let part_len = cursor.read_u32("key part length")? as usize;
        let mut part = SliceCursor::new(cursor.take(part_len, "key part")?);
        let kind = part.read_u16("key part type")?;
        parts.push(KeyPart::new(kind, part.rest()));
    }

    if !cursor.is_empty() {
        return Err(PayloadError::TrailingBytes("key", cursor.remaining()));
    }

    Ok(Key::new(parts))
}

/// Encodes a payload at the latest encoding version.
pub fn encode_payload(payload: &Payload) -> Vec<u8> {
    encode_payload_versioned(payload, PAYLOAD_ENCODING_VERSION)
}

/// Encodes a payload at a specific encoding version (0 or 1).
pub fn encode_payload_versioned(payload: &Payload, version: u16) -> Vec<u8> {
    let mut key = Vec::new();
    key.extend_from_slice(&(payload.key.parts.len() as u16).to_be_bytes());
    for part in &payload.key.parts {
        key.extend_from_slice(&((2 + part.value.len()) as u32).to_be_bytes());
        key.extend_from_slice(&part.kind.to_be_bytes());
        key.extend_from_slice(&part.value);
    }

    let mut buf = Vec::with_capacity(2 + 1 + 4 + key.len() + 8 + payload.value.len());
    buf.extend_from_slice(&version.to_be_bytes());
    buf.push(TYPE_PAYLOAD);
    buf.extend_from_slice(&(key.len() as u32).to_be_bytes());
    buf.extend_from_slice(&key);
    if version == 0 {
        buf.extend_from_slice(&(payload.value.len() as u32).to_be_bytes());
    } else {
        buf.extend_from_slice(&(payload.value.len() as u64).to_be_bytes());
    }
    buf.extend_from_slice(&payload.value);
    buf
}

/// Bounds-checked big-endian reads over a byte slice
struct SliceCursor<'a> {
    data: &'a [u8],
}

impl<'a> SliceCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take(&mut self, len: usize, what: &'static str) -> PayloadResult<&'a [u8]> {
        if self.data.len() < len {
            return Err(PayloadError::Truncated(what));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn read_u8(&mut self, what: &'static str) -> PayloadResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn read_u16(&mut self, what: &'static str) -> PayloadResult<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self, what: &'static str) -> PayloadResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self, what: &'static str) -> PayloadResult<u64> {
        let b = self.take(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.data)
    }

    fn remaining(&self) -> usize {
        self.data.len()
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
