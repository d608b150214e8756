use super::*;
use crate::descriptor::{ListDescriptor, RecordDescriptor};
use crate::path::{self, Segment};
use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

type SmallVec8<T> = SmallVec<[T; 8]>;

/// Returned when SSZ decoding fails.
#[derive(Debug, PartialEq, Clone)]
pub enum DecodeError {
    /// Fewer bytes remain at `offset` than the item being decoded requires.
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A list of fixed-size elements has `remaining` trailing bytes which are fewer than one
    /// element of `element_len` bytes.
    Framing { remaining: usize, element_len: usize },
    /// A boolean was encoded as something other than `0x00` or `0x01`.
    InvalidBool(u8),
    /// An offset points “backwards” into the fixed-bytes portion of the message, essentially
    /// double-decoding bytes that will also be decoded as fixed-length.
    OffsetIntoFixedPortion(usize),
    /// The first offset does not point to the byte that follows the fixed byte portion,
    /// essentially skipping a variable-length byte.
    OffsetSkipsVariableBytes(usize),
    /// An offset points to bytes prior to the previous offset. Depending on how you look at it,
    /// this either double-decodes bytes or makes the first offset a negative-length.
    OffsetsAreDecreasing(usize),
    /// An offset references byte indices that do not exist in the source bytes.
    OffsetOutOfBounds(usize),
    /// A list of variable-size elements does not have a fixed portion that is cleanly
    /// divisible by `BYTES_PER_LENGTH_OFFSET`.
    InvalidListFixedBytesLen(usize),
    /// A bounded list holds more elements than permitted.
    ListTooLong { len: usize, max_len: usize },
    /// A top-level value was decoded but bytes were left over.
    TrailingBytes { consumed: usize, len: usize },
    /// The wrapped error occurred while decoding the named record field.
    InField {
        field: String,
        error: Box<DecodeError>,
    },
    /// The wrapped error occurred while decoding the list element at `index`.
    InElement {
        index: usize,
        error: Box<DecodeError>,
    },
}

impl DecodeError {
    pub fn in_field(self, field: &str) -> Self {
        DecodeError::InField {
            field: field.to_string(),
            error: Box::new(self),
        }
    }

    pub fn in_element(self, index: usize) -> Self {
        DecodeError::InElement {
            index,
            error: Box::new(self),
        }
    }

    /// The innermost error, with all field/element annotations stripped.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::InField { error, .. } | DecodeError::InElement { error, .. } => {
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
            DecodeError::InField { field, error } => {
                current = error.as_ref();
                Some(Segment::Field(field.as_str()))
            }
            DecodeError::InElement { index, error } => {
                current = error.as_ref();
                Some(Segment::Element(*index))
            }
            _ => None,
        })
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let path = self.path();

        if path.is_empty() {
            write!(f, "{:?}", self.root_cause())
        } else {
            write!(f, "field `{}`: {:?}", path, self.root_cause())
        }
    }
}

impl std::error::Error for DecodeError {}

/// Performs checks on the `offset` based upon the other parameters provided.
///
/// ## Detail
///
/// - `offset`: the offset bytes (e.g., result of `read_offset(..)`).
/// - `previous_offset`: unless this is the first offset in the SSZ object, the value of the
/// previously-read offset. Used to ensure offsets are not decreasing.
/// - `num_bytes`: the total number of bytes in the SSZ object. Used to ensure the offset is not
/// out of bounds.
/// - `num_fixed_bytes`: the number of fixed-bytes in the object, if it is known. Used to ensure
/// that the first offset doesn't skip any variable bytes.
pub fn sanitize_offset(
    offset: usize,
    previous_offset: Option<usize>,
    num_bytes: usize,
    num_fixed_bytes: Option<usize>,
) -> Result<usize, DecodeError> {
    if num_fixed_bytes.map_or(false, |fixed_bytes| offset < fixed_bytes) {
        Err(DecodeError::OffsetIntoFixedPortion(offset))
    } else if previous_offset.is_none()
        && num_fixed_bytes.map_or(false, |fixed_bytes| offset != fixed_bytes)
    {
        Err(DecodeError::OffsetSkipsVariableBytes(offset))
    } else if offset > num_bytes {
        Err(DecodeError::OffsetOutOfBounds(offset))
    } else if previous_offset.map_or(false, |prev| prev > offset) {
        Err(DecodeError::OffsetsAreDecreasing(offset))
    } else {
        Ok(offset)
    }
}

/// Reads the `BYTES_PER_LENGTH_OFFSET`-byte little-endian offset at `bytes[position]`.
pub fn read_offset(bytes: &[u8], position: usize) -> Result<usize, DecodeError> {
    let slice = bytes
        .get(position..position.saturating_add(BYTES_PER_LENGTH_OFFSET))
        .ok_or_else(|| DecodeError::TruncatedInput {
            offset: position,
            needed: BYTES_PER_LENGTH_OFFSET,
            available: bytes.len().saturating_sub(position),
        })?;

    let mut array = [0; BYTES_PER_LENGTH_OFFSET];
    array.copy_from_slice(slice);

    Ok(u32::from_le_bytes(array) as usize)
}

#[derive(Copy, Clone, Debug)]
struct Offset {
    position: usize,
    offset: usize,
}

/// Splits the bytes of a record into one slice per field.
///
/// Fixed-size fields are sliced directly out of the fixed portion, variable-size fields are
/// located via their offsets once every field has been registered. The builder is then
/// converted into a `SszDecoder` which decodes the slices into values.
pub struct SszDecoderBuilder<'a> {
    bytes: &'a [u8],
    items: SmallVec8<&'a [u8]>,
    offsets: SmallVec8<Offset>,
    items_index: usize,
}

impl<'a> SszDecoderBuilder<'a> {
    /// Instantiate a new builder over `bytes`, which must be exactly the bytes of one record.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            items: smallvec![],
            offsets: smallvec![],
            items_index: 0,
        }
    }

    /// Declares that an item described by `descriptor` is the next item in `bytes`.
    pub fn register(&mut self, descriptor: &TypeDescriptor) -> Result<(), DecodeError> {
        if descriptor.is_fixed_len() {
            let start = self.items_index;
            let len = descriptor.fixed_len();
            self.items_index += len;

            let slice = self.bytes.get(start..self.items_index).ok_or_else(|| {
                DecodeError::TruncatedInput {
                    offset: start,
                    needed: len,
                    available: self.bytes.len().saturating_sub(start),
                }
            })?;

            self.items.push(slice);
        } else {
            self.offsets.push(Offset {
                position: self.items.len(),
                offset: sanitize_offset(
                    read_offset(self.bytes, self.items_index)?,
                    self.offsets.last().map(|o| o.offset),
                    self.bytes.len(),
                    None,
                )?,
            });

            // Push an empty slice into items; it will be replaced later.
            self.items.push(&[]);

            self.items_index += BYTES_PER_LENGTH_OFFSET;
        }

        Ok(())
    }

    fn finalize(&mut self) -> Result<(), DecodeError> {
        if let Some(first_offset) = self.offsets.first().map(|o| o.offset) {
            // The first offset must point to the byte immediately following the fixed portion.
            match first_offset.cmp(&self.items_index) {
                Ordering::Less => return Err(DecodeError::OffsetIntoFixedPortion(first_offset)),
                Ordering::Greater => {
                    return Err(DecodeError::OffsetSkipsVariableBytes(first_offset))
                }
                Ordering::Equal => (),
            }

            for pair in self.offsets.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                self.items[a.position] = &self.bytes[a.offset..b.offset];
            }

            if let Some(last) = self.offsets.last() {
                self.items[last.position] = &self.bytes[last.offset..]
            }
        } else if self.items_index != self.bytes.len() {
            return Err(DecodeError::TrailingBytes {
                consumed: self.items_index,
                len: self.bytes.len(),
            });
        }

        Ok(())
    }

    /// Finalizes the builder, returning a `SszDecoder` that may be used to decode the values.
    pub fn build(mut self) -> Result<SszDecoder<'a>, DecodeError> {
        self.finalize()?;

        Ok(SszDecoder { items: self.items })
    }
}

/// Decodes the slices produced by a `SszDecoderBuilder`, in registration order.
pub struct SszDecoder<'a> {
    items: SmallVec8<&'a [u8]>,
}

impl<'a> SszDecoder<'a> {
    /// Decodes the next item.
    ///
    /// # Panics
    ///
    /// Panics when attempting to decode more items than were registered.
    pub fn decode_next(&mut self, descriptor: &TypeDescriptor) -> Result<Value, DecodeError> {
        decode_exact(descriptor, self.items.remove(0))
    }
}

fn tail(bytes: &[u8], offset: usize) -> Result<&[u8], DecodeError> {
    bytes
        .get(offset..)
        .ok_or(DecodeError::OffsetOutOfBounds(offset))
}

/// Decodes a record starting at `bytes[offset]`, returning it with the number of bytes
/// consumed.
///
/// A fixed-size record consumes exactly its fixed length, so `bytes` may continue past it. A
/// record with variable-size fields consumes everything from `offset` to the end of `bytes`.
pub fn decode_record(
    record: &RecordDescriptor,
    bytes: &[u8],
    offset: usize,
) -> Result<(Value, usize), DecodeError> {
    let mut fields = BTreeMap::new();

    if record.is_fixed_len() {
        let mut consumed = 0;

        for field in record.fields() {
            let (value, len) = crate::decode(&field.descriptor, bytes, offset + consumed)
                .map_err(|e| e.in_field(&field.name))?;

            consumed += len;
            fields.insert(field.name.clone(), value);
        }

        Ok((Value::Record(fields), consumed))
    } else {
        let bytes = tail(bytes, offset)?;
        let mut builder = SszDecoderBuilder::new(bytes);

        for field in record.fields() {
            builder
                .register(&field.descriptor)
                .map_err(|e| e.in_field(&field.name))?;
        }

        let mut decoder = builder.build()?;

        for field in record.fields() {
            let value = decoder
                .decode_next(&field.descriptor)
                .map_err(|e| e.in_field(&field.name))?;

            fields.insert(field.name.clone(), value);
        }

        Ok((Value::Record(fields), bytes.len()))
    }
}

fn check_list_len(list: &ListDescriptor, len: usize) -> Result<(), DecodeError> {
    match list.max_len() {
        Some(max_len) if len > max_len => Err(DecodeError::ListTooLong { len, max_len }),
        _ => Ok(()),
    }
}

/// Decodes a list from `bytes`.
///
/// The list carries no length prefix: `bytes` must be exactly the bytes of this list, with no
/// sibling data after it. Top-level callers satisfy this by passing the whole buffer; lists
/// nested in records or other lists receive their exact slice from the enclosing offset table.
pub fn decode_list(list: &ListDescriptor, bytes: &[u8]) -> Result<Value, DecodeError> {
    if list.is_byte_list() {
        check_list_len(list, bytes.len())?;
        return Ok(Value::Bytes(bytes.to_vec()));
    }

    let items = if list.element().is_fixed_len() {
        decode_fixed_len_items(list, bytes)?
    } else {
        decode_variable_len_items(list, bytes)?
    };

    Ok(Value::List(items))
}

/// Decodes elements back-to-back until `bytes` is exhausted. Leftover bytes that cannot hold a
/// whole element are a framing error.
fn decode_fixed_len_items(list: &ListDescriptor, bytes: &[u8]) -> Result<Vec<Value>, DecodeError> {
    let element = list.element();
    let element_len = element.fixed_len();

    // Only reachable with a hand-built `PrimitiveKind::FixedBytes(0)`.
    if element_len == 0 {
        return if bytes.is_empty() {
            Ok(vec![])
        } else {
            Err(DecodeError::Framing {
                remaining: bytes.len(),
                element_len,
            })
        };
    }

    check_list_len(list, bytes.len() / element_len)?;

    let mut items = Vec::with_capacity(bytes.len() / element_len);
    let mut offset = 0;

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;

        if remaining < element_len {
            return Err(DecodeError::Framing {
                remaining,
                element_len,
            });
        }

        let (item, consumed) =
            crate::decode(element, bytes, offset).map_err(|e| e.in_element(items.len()))?;

        items.push(item);
        offset += consumed;
    }

    Ok(items)
}

/// Decodes a list of variable-size elements, located by the table of offsets at the start of
/// `bytes`. The first offset also gives the number of elements.
fn decode_variable_len_items(
    list: &ListDescriptor,
    bytes: &[u8],
) -> Result<Vec<Value>, DecodeError> {
    if bytes.is_empty() {
        return Ok(vec![]);
    }

    if bytes.len() < BYTES_PER_LENGTH_OFFSET {
        return Err(DecodeError::Framing {
            remaining: bytes.len(),
            element_len: BYTES_PER_LENGTH_OFFSET,
        });
    }

    let first_offset = read_offset(bytes, 0)?;
    sanitize_offset(first_offset, None, bytes.len(), Some(first_offset))?;

    if first_offset % BYTES_PER_LENGTH_OFFSET != 0 || first_offset < BYTES_PER_LENGTH_OFFSET {
        return Err(DecodeError::InvalidListFixedBytesLen(first_offset));
    }

    let num_items = first_offset / BYTES_PER_LENGTH_OFFSET;
    check_list_len(list, num_items)?;

    let mut items = Vec::with_capacity(num_items);
    let mut offset = first_offset;

    for i in 1..=num_items {
        let slice_option = if i == num_items {
            bytes.get(offset..)
        } else {
            let start = offset;

            let next_offset = read_offset(bytes, i * BYTES_PER_LENGTH_OFFSET)?;
            offset = sanitize_offset(next_offset, Some(offset), bytes.len(), Some(first_offset))?;

            bytes.get(start..offset)
        };

        let slice = slice_option.ok_or(DecodeError::OffsetOutOfBounds(offset))?;

        items.push(decode_exact(list.element(), slice).map_err(|e| e.in_element(i - 1))?);
    }

    Ok(items)
}
