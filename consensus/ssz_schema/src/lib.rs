//! Provides encoding (serialization) and decoding (deserialization) in the SimpleSerialize (SSZ)
//! format, driven by runtime type descriptors rather than by Rust types.
//!
//! A `TypeDescriptor` declares the shape of a type: a primitive, a record of named fields in a
//! fixed order, or a list of elements. A `Value` is an instance of such a type. The engine
//! turns values into bytes and back by walking the descriptor.
//!
//! ## Example
//!
//! ```rust
//! use ssz_schema::{decode_exact, encode, TypeDescriptor, Value};
//!
//! let descriptor = TypeDescriptor::record(
//!     "ProposalSignedData",
//!     vec![
//!         ("slot", TypeDescriptor::uint64()),
//!         ("shard", TypeDescriptor::uint64()),
//!         ("blockRoot", TypeDescriptor::bytes32()),
//!     ],
//! )
//! .unwrap();
//!
//! let value = Value::record(vec![
//!     ("slot", Value::uint(5)),
//!     ("shard", Value::uint(1)),
//!     ("blockRoot", Value::zero_bytes(32)),
//! ]);
//!
//! let bytes = encode(&descriptor, &value).unwrap();
//! assert_eq!(bytes.len(), 48);
//!
//! assert_eq!(decode_exact(&descriptor, &bytes).unwrap(), value);
//! ```
mod decode;
mod descriptor;
mod encode;
mod path;
mod primitive;
mod value;

pub use decode::{
    decode_list, decode_record, read_offset, sanitize_offset, DecodeError, SszDecoder,
    SszDecoderBuilder,
};
pub use descriptor::{
    DescriptorError, Field, ListDescriptor, PrimitiveKind, RecordDescriptor, TypeDescriptor,
};
pub use encode::{
    encode_length, encode_list, encode_record, encoded_len, ssz_append, EncodeError, SszEncoder,
};
pub use primitive::{decode_primitive, encode_primitive};
pub use value::Value;

pub const BYTES_PER_LENGTH_OFFSET: usize = 4;
pub const MAX_LENGTH_VALUE: usize = (1 << (BYTES_PER_LENGTH_OFFSET * 8)) - 1;

/// Encodes `value` as an instance of `descriptor`.
pub fn encode(descriptor: &TypeDescriptor, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(encoded_len(descriptor, value)?);

    ssz_append(descriptor, value, &mut buf)?;

    Ok(buf)
}

/// Decodes an instance of `descriptor` starting at `bytes[offset]`, returning the value and the
/// number of bytes consumed.
///
/// Fixed-size types consume exactly `descriptor.fixed_len()` bytes and may be followed by other
/// data. Variable-size types carry no length of their own and consume every byte from `offset`
/// to the end of `bytes`.
pub fn decode(
    descriptor: &TypeDescriptor,
    bytes: &[u8],
    offset: usize,
) -> Result<(Value, usize), DecodeError> {
    match descriptor {
        TypeDescriptor::Primitive(kind) => decode_primitive(*kind, bytes, offset),
        TypeDescriptor::Record(record) => decode_record(record, bytes, offset),
        TypeDescriptor::List(list) => {
            let bytes = bytes
                .get(offset..)
                .ok_or(DecodeError::OffsetOutOfBounds(offset))?;

            decode_list(list, bytes).map(|value| (value, bytes.len()))
        }
    }
}

/// Decodes `bytes` as exactly one instance of `descriptor`, failing if any bytes are left over.
pub fn decode_exact(descriptor: &TypeDescriptor, bytes: &[u8]) -> Result<Value, DecodeError> {
    let (value, consumed) = decode(descriptor, bytes, 0)?;

    if consumed != bytes.len() {
        return Err(DecodeError::TrailingBytes {
            consumed,
            len: bytes.len(),
        });
    }

    Ok(value)
}
