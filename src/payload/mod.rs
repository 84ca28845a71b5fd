//! Payload decoder
//!
//! Turns a node's encoded payload into a structured key and an opaque value.
//! Only key parts 0 (owner) and 2 (path) are used downstream; part 1 is the
//! controller.

mod codec;
mod errors;
mod key;

pub use codec::{
    decode_payload, encode_payload, encode_payload_versioned, PAYLOAD_ENCODING_VERSION,
    TYPE_PAYLOAD,
};
pub use errors::{PayloadError, PayloadResult};
pub use key::{
    Key, KeyPart, LogicalKey, Payload, KEY_PART_CONTROLLER, KEY_PART_OWNER, KEY_PART_PATH,
    PATH_SEPARATOR,
};
