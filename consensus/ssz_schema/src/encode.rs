use super::*;
use crate::descriptor::{ListDescriptor, RecordDescriptor};
use crate::path::{self, Segment};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Returned when SSZ encoding fails.
#[derive(Debug, PartialEq, Clone)]
pub enum EncodeError {
    /// An integer is negative or too large for the declared width.
    Range { kind: PrimitiveKind, value: i128 },
    /// A fixed-size byte string has the wrong number of bytes.
    Length { expected: usize, len: usize },
    /// A record value lacks one of the fields declared by its descriptor.
    MissingField { record: String, field: String },
    /// A record value holds a field that its descriptor does not declare.
    UnknownField { record: String, field: String },
    /// The value variant does not match the descriptor, e.g. a list given for a `uint64`.
    UnexpectedValue {
        expected: String,
        found: &'static str,
    },
    /// A bounded list holds more elements than permitted.
    ListTooLong { len: usize, max_len: usize },
    /// An offset would not fit into `BYTES_PER_LENGTH_OFFSET` bytes.
    OffsetOverflow(usize),
    /// The wrapped error occurred while encoding the named record field.
    InField {
        field: String,
        error: Box<EncodeError>,
    },
    /// The wrapped error occurred while encoding the list element at `index`.
    InElement {
        index: usize,
        error: Box<EncodeError>,
    },
}

impl EncodeError {
    pub fn in_field(self, field: &str) -> Self {
        EncodeError::InField {
            field: field.to_string(),
            error: Box::new(self),
        }
    }

    pub fn in_element(self, index: usize) -> Self {
        EncodeError::InElement {
            index,
            error: Box::new(self),
        }
    }

    /// The innermost error, with all field/element annotations stripped.
    pub fn root_cause(&self) -> &EncodeError {
        match self {
            EncodeError::InField { error, .. } | EncodeError::InElement { error, .. } => {
                error.root_cause()
            }
            other => other,
        }
    }

    /// The location of the failure, e.g. `proposalData1.slot`. Empty for top-level errors.
    pub fn path(&self) -> String {
        path::render(self.segments())
    }

    fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        let mut current = self;
        std::iter::from_fn(move || match current {
            EncodeError::InField { field, error } => {
                current = error.as_ref();
                Some(Segment::Field(field.as_str()))
            }
            EncodeError::InElement { index, error } => {
                current = error.as_ref();
                Some(Segment::Element(*index))
            }
            _ => None,
        })
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let path = self.path();

        if path.is_empty() {
            write!(f, "{:?}", self.root_cause())
        } else {
            write!(f, "field `{}`: {:?}", path, self.root_cause())
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encode `offset` as a little-endian `BYTES_PER_LENGTH_OFFSET`-byte array.
pub fn encode_length(offset: usize) -> Result<[u8; BYTES_PER_LENGTH_OFFSET], EncodeError> {
    if offset > MAX_LENGTH_VALUE {
        return Err(EncodeError::OffsetOverflow(offset));
    }

    let mut bytes = [0; BYTES_PER_LENGTH_OFFSET];
    bytes.copy_from_slice(&offset.to_le_bytes()[0..BYTES_PER_LENGTH_OFFSET]);
    Ok(bytes)
}

/// Provides the one-pass encoding of records and lists of variable-size items.
///
/// Fixed-size items are written directly into the fixed portion; each variable-size item is
/// replaced there by an offset and its bytes are buffered until `finalize` appends them after
/// the fixed portion.
///
/// ## Example
///
/// ```rust
/// use ssz_schema::{SszEncoder, TypeDescriptor, Value};
///
/// let a = TypeDescriptor::uint16();
/// let b = TypeDescriptor::byte_list();
/// let c = TypeDescriptor::uint16();
///
/// let mut buf = vec![];
/// let offset = a.fixed_len() + b.fixed_len() + c.fixed_len();
///
/// let mut encoder = SszEncoder::container(&mut buf, offset);
/// encoder.append(&a, &Value::uint(42)).unwrap();
/// encoder.append(&b, &Value::bytes(vec![0, 1, 2, 3])).unwrap();
/// encoder.append(&c, &Value::uint(11)).unwrap();
/// encoder.finalize();
///
/// assert_eq!(buf, vec![42, 0, 8, 0, 0, 0, 11, 0, 0, 1, 2, 3]);
/// ```
pub struct SszEncoder<'a> {
    offset: usize,
    buf: &'a mut Vec<u8>,
    variable_bytes: Vec<u8>,
}

impl<'a> SszEncoder<'a> {
    /// Instantiate a new encoder for a container whose fixed portion is `num_fixed_bytes` long.
    pub fn container(buf: &'a mut Vec<u8>, num_fixed_bytes: usize) -> Self {
        buf.reserve(num_fixed_bytes);

        Self {
            offset: num_fixed_bytes,
            buf,
            variable_bytes: vec![],
        }
    }

    /// Append `value`, described by `descriptor`, to the container.
    ///
    /// On error neither the fixed portion nor the buffered variable bytes are changed.
    pub fn append(&mut self, descriptor: &TypeDescriptor, value: &Value) -> Result<(), EncodeError> {
        if descriptor.is_fixed_len() {
            ssz_append(descriptor, value, self.buf)
        } else {
            let offset = encode_length(self.offset)?;

            let start = self.variable_bytes.len();
            ssz_append(descriptor, value, &mut self.variable_bytes)?;
            self.offset += self.variable_bytes.len() - start;

            self.buf.extend_from_slice(&offset);
            Ok(())
        }
    }

    /// Write the variable bytes to `self.buf`.
    ///
    /// This method must be called after the final `append(..)` call.
    pub fn finalize(&mut self) -> &mut Vec<u8> {
        self.buf.append(&mut self.variable_bytes);

        &mut *self.buf
    }
}

/// Runs `f` against `buf`, truncating `buf` back to its starting length if `f` fails.
fn append_or_rollback<F>(buf: &mut Vec<u8>, f: F) -> Result<(), EncodeError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), EncodeError>,
{
    let start = buf.len();
    let result = f(buf);

    if result.is_err() {
        buf.truncate(start);
    }

    result
}

/// Appends the SSZ encoding of `value` to `buf`, dispatching on the descriptor variant.
///
/// On error `buf` is left as it was.
pub fn ssz_append(
    descriptor: &TypeDescriptor,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match descriptor {
        TypeDescriptor::Primitive(kind) => encode_primitive(*kind, value, buf),
        TypeDescriptor::Record(record) => encode_record(record, value, buf),
        TypeDescriptor::List(list) => encode_list(list, value, buf),
    }
}

fn record_fields<'v>(
    record: &RecordDescriptor,
    value: &'v Value,
) -> Result<&'v BTreeMap<String, Value>, EncodeError> {
    let fields = value
        .as_record()
        .ok_or_else(|| EncodeError::UnexpectedValue {
            expected: record.name().to_string(),
            found: value.variant_name(),
        })?;

    if let Some(unknown) = fields.keys().find(|name| record.field(name).is_none()) {
        return Err(EncodeError::UnknownField {
            record: record.name().to_string(),
            field: unknown.clone(),
        });
    }

    Ok(fields)
}

fn field_value<'v>(
    record: &RecordDescriptor,
    fields: &'v BTreeMap<String, Value>,
    name: &str,
) -> Result<&'v Value, EncodeError> {
    fields.get(name).ok_or_else(|| EncodeError::MissingField {
        record: record.name().to_string(),
        field: name.to_string(),
    })
}

/// Encodes the fields of `value` in the order declared by `record`.
///
/// Records without variable-size fields are a plain concatenation of their fields; otherwise
/// each variable-size field is represented in the fixed portion by an offset.
pub fn encode_record(
    record: &RecordDescriptor,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    append_or_rollback(buf, |buf| encode_record_fields(record, value, buf))
}

fn encode_record_fields(
    record: &RecordDescriptor,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let fields = record_fields(record, value)?;

    let mut encoder = SszEncoder::container(buf, record.fixed_part_len());

    for field in record.fields() {
        let field_value = field_value(record, fields, &field.name)?;

        encoder
            .append(&field.descriptor, field_value)
            .map_err(|e| e.in_field(&field.name))?;
    }

    encoder.finalize();

    Ok(())
}

/// Encodes every element of the list `value`, in order.
///
/// Fixed-size elements are concatenated with no separators; variable-size elements are
/// preceded by a table of offsets. An empty list encodes to no bytes at all.
pub fn encode_list(
    list: &ListDescriptor,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    append_or_rollback(buf, |buf| encode_list_items(list, value, buf))
}

fn encode_list_items(
    list: &ListDescriptor,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let unexpected = || EncodeError::UnexpectedValue {
        expected: TypeDescriptor::List(Arc::new(list.clone())).to_string(),
        found: value.variant_name(),
    };

    if list.is_byte_list() {
        let bytes = value.as_bytes().ok_or_else(unexpected)?;
        check_list_len(list, bytes.len())?;

        buf.extend_from_slice(bytes);
        return Ok(());
    }

    let items = value.as_list().ok_or_else(unexpected)?;
    check_list_len(list, items.len())?;

    let element = list.element();

    if element.is_fixed_len() {
        buf.reserve(element.fixed_len() * items.len());

        for (i, item) in items.iter().enumerate() {
            ssz_append(element, item, buf).map_err(|e| e.in_element(i))?;
        }
    } else {
        let mut encoder = SszEncoder::container(buf, items.len() * BYTES_PER_LENGTH_OFFSET);

        for (i, item) in items.iter().enumerate() {
            encoder.append(element, item).map_err(|e| e.in_element(i))?;
        }

        encoder.finalize();
    }

    Ok(())
}

fn check_list_len(list: &ListDescriptor, len: usize) -> Result<(), EncodeError> {
    match list.max_len() {
        Some(max_len) if len > max_len => Err(EncodeError::ListTooLong { len, max_len }),
        _ => Ok(()),
    }
}

/// Returns the number of bytes `value` encodes to, without encoding it.
///
/// The shape of `value` (record fields, list lengths, value variants) is checked, but the
/// contents of primitives are not; `encode` remains the authority on whether `value` is valid.
pub fn encoded_len(descriptor: &TypeDescriptor, value: &Value) -> Result<usize, EncodeError> {
    match descriptor {
        TypeDescriptor::Primitive(kind) => Ok(kind.fixed_len()),
        TypeDescriptor::Record(record) if record.is_fixed_len() => Ok(record.fixed_part_len()),
        TypeDescriptor::Record(record) => {
            let fields = record_fields(record, value)?;

            record.fields().iter().try_fold(0, |len, field| {
                let field_len = if field.descriptor.is_fixed_len() {
                    field.descriptor.fixed_len()
                } else {
                    let field_value = field_value(record, fields, &field.name)?;
                    BYTES_PER_LENGTH_OFFSET
                        + encoded_len(&field.descriptor, field_value)
                            .map_err(|e| e.in_field(&field.name))?
                };
                Ok::<_, EncodeError>(len + field_len)
            })
        }
        TypeDescriptor::List(list) => {
            let unexpected = || EncodeError::UnexpectedValue {
                expected: descriptor.to_string(),
                found: value.variant_name(),
            };

            if list.is_byte_list() {
                let bytes = value.as_bytes().ok_or_else(unexpected)?;
                check_list_len(list, bytes.len())?;
                return Ok(bytes.len());
            }

            let items = value.as_list().ok_or_else(unexpected)?;
            check_list_len(list, items.len())?;

            let element = list.element();
            if element.is_fixed_len() {
                Ok(element.fixed_len() * items.len())
            } else {
                items.iter().enumerate().try_fold(0, |len, (i, item)| {
                    let item_len = encoded_len(element, item).map_err(|e| e.in_element(i))?;
                    Ok::<_, EncodeError>(len + BYTES_PER_LENGTH_OFFSET + item_len)
                })
            }
        }
    }
}
