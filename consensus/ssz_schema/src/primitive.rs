use crate::descriptor::PrimitiveKind;
use crate::{DecodeError, EncodeError, Value};

/// The largest integer representable by an unsigned kind of `width` bytes.
fn uint_max(width: usize) -> i128 {
    // `width` is at most 8 for the uint kinds, so this cannot overflow an `i128`.
    (1_i128 << (width * 8)) - 1
}

/// Appends the SSZ encoding of a primitive `value` of the given `kind` to `buf`.
///
/// Unsigned integers are written little-endian in exactly `kind.fixed_len()` bytes; fixed
/// byte strings are written unchanged.
pub fn encode_primitive(
    kind: PrimitiveKind,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match (kind, value) {
        (kind, Value::Integer(int)) if kind.is_uint() => {
            let width = kind.fixed_len();

            if *int < 0 || *int > uint_max(width) {
                return Err(EncodeError::Range { kind, value: *int });
            }

            buf.extend_from_slice(&(*int as u128).to_le_bytes()[0..width]);
            Ok(())
        }
        (PrimitiveKind::Bool, Value::Bool(b)) => {
            buf.push(*b as u8);
            Ok(())
        }
        (PrimitiveKind::FixedBytes(width), Value::Bytes(bytes)) => {
            if bytes.len() != width {
                return Err(EncodeError::Length {
                    expected: width,
                    len: bytes.len(),
                });
            }

            buf.extend_from_slice(bytes);
            Ok(())
        }
        (kind, other) => Err(EncodeError::UnexpectedValue {
            expected: kind.to_string(),
            found: other.variant_name(),
        }),
    }
}

/// Decodes a primitive of the given `kind` starting at `bytes[offset]`.
///
/// Returns the value and the number of bytes consumed, which is always `kind.fixed_len()`.
pub fn decode_primitive(
    kind: PrimitiveKind,
    bytes: &[u8],
    offset: usize,
) -> Result<(Value, usize), DecodeError> {
    let width = kind.fixed_len();

    let slice = bytes
        .get(offset..offset.saturating_add(width))
        .ok_or_else(|| DecodeError::TruncatedInput {
            offset,
            needed: width,
            available: bytes.len().saturating_sub(offset),
        })?;

    let value = match kind {
        PrimitiveKind::Bool => match slice[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(DecodeError::InvalidBool(other)),
        },
        PrimitiveKind::FixedBytes(_) => Value::Bytes(slice.to_vec()),
        PrimitiveKind::Uint8
        | PrimitiveKind::Uint16
        | PrimitiveKind::Uint32
        | PrimitiveKind::Uint64 => {
            let mut array = [0; 16];
            array[0..width].copy_from_slice(slice);

            Value::Integer(u128::from_le_bytes(array) as i128)
        }
    };

    Ok((value, width))
}
