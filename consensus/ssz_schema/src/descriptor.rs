use crate::BYTES_PER_LENGTH_OFFSET;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Returned when a descriptor cannot be constructed.
#[derive(Debug, PartialEq, Clone)]
pub enum DescriptorError {
    /// A fixed-size byte string must be at least one byte wide.
    ZeroLengthBytes,
    /// A record must declare at least one field, otherwise it would encode to nothing.
    EmptyRecord { record: String },
    /// Two fields of the same record share a name.
    DuplicateField { record: String, field: String },
}

/// The fixed-width scalar kinds understood by the engine.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PrimitiveKind {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    /// A byte string of exactly the given width.
    FixedBytes(usize),
}

impl PrimitiveKind {
    /// The number of bytes every value of this kind occupies on the wire.
    pub fn fixed_len(&self) -> usize {
        match self {
            PrimitiveKind::Uint8 | PrimitiveKind::Bool => 1,
            PrimitiveKind::Uint16 => 2,
            PrimitiveKind::Uint32 => 4,
            PrimitiveKind::Uint64 => 8,
            PrimitiveKind::FixedBytes(width) => *width,
        }
    }

    /// Returns `true` for the unsigned integer kinds.
    pub fn is_uint(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::Uint8
                | PrimitiveKind::Uint16
                | PrimitiveKind::Uint32
                | PrimitiveKind::Uint64
        )
    }

    /// Parses the schema name of a primitive, e.g. `uint64` or `bytes32`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uint8" => Some(PrimitiveKind::Uint8),
            "uint16" => Some(PrimitiveKind::Uint16),
            "uint32" => Some(PrimitiveKind::Uint32),
            "uint64" => Some(PrimitiveKind::Uint64),
            "bool" => Some(PrimitiveKind::Bool),
            other => other
                .strip_prefix("bytes")
                .and_then(|width| width.parse::<usize>().ok())
                .filter(|width| *width > 0)
                .map(PrimitiveKind::FixedBytes),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrimitiveKind::Uint8 => write!(f, "uint8"),
            PrimitiveKind::Uint16 => write!(f, "uint16"),
            PrimitiveKind::Uint32 => write!(f, "uint32"),
            PrimitiveKind::Uint64 => write!(f, "uint64"),
            PrimitiveKind::Bool => write!(f, "bool"),
            PrimitiveKind::FixedBytes(width) => write!(f, "bytes{}", width),
        }
    }
}

/// A named field of a record.
#[derive(Debug, PartialEq, Clone)]
pub struct Field {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

/// An ordered collection of named fields. The declaration order is the wire order.
#[derive(Debug, PartialEq, Clone)]
pub struct RecordDescriptor {
    name: String,
    fields: Vec<Field>,
    is_fixed_len: bool,
    fixed_part_len: usize,
}

impl RecordDescriptor {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        let name = name.into();
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(field_name, descriptor)| Field {
                name: field_name.into(),
                descriptor,
            })
            .collect();

        if fields.is_empty() {
            return Err(DescriptorError::EmptyRecord { record: name });
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DescriptorError::DuplicateField {
                    record: name,
                    field: field.name.clone(),
                });
            }
        }

        let is_fixed_len = fields.iter().all(|f| f.descriptor.is_fixed_len());
        let fixed_part_len = fields.iter().map(|f| f.descriptor.fixed_len()).sum();

        Ok(Self {
            name,
            fields,
            is_fixed_len,
            fixed_part_len,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the descriptor of the field called `name`, if any.
    pub fn field(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.descriptor)
    }

    /// Returns `true` if no field (recursively) contains a list.
    pub fn is_fixed_len(&self) -> bool {
        self.is_fixed_len
    }

    /// The length of the fixed portion of an encoded record: the full length for fixed-size
    /// fields plus one offset for each variable-size field.
    pub fn fixed_part_len(&self) -> usize {
        self.fixed_part_len
    }
}

/// A variable-length sequence of values sharing one element descriptor.
#[derive(Debug, PartialEq, Clone)]
pub struct ListDescriptor {
    element: TypeDescriptor,
    max_len: Option<usize>,
}

impl ListDescriptor {
    pub fn new(element: TypeDescriptor, max_len: Option<usize>) -> Self {
        Self { element, max_len }
    }

    pub fn element(&self) -> &TypeDescriptor {
        &self.element
    }

    /// The maximum number of elements, if the list is bounded.
    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// Lists of `uint8` are carried as `Value::Bytes` rather than a list of integers.
    pub fn is_byte_list(&self) -> bool {
        self.element == TypeDescriptor::Primitive(PrimitiveKind::Uint8)
    }
}

/// Value-level description of an SSZ type.
///
/// Descriptors are immutable once built and cheap to clone; records and lists are shared via
/// `Arc` so a single descriptor tree may be used from many threads at once. Because every
/// descriptor is built from already-constructed children, a descriptor tree can never contain
/// a cycle.
#[derive(Debug, PartialEq, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Record(Arc<RecordDescriptor>),
    List(Arc<ListDescriptor>),
}

impl TypeDescriptor {
    pub fn uint8() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Uint8)
    }

    pub fn uint16() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Uint16)
    }

    pub fn uint32() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Uint32)
    }

    pub fn uint64() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Uint64)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Bool)
    }

    pub fn fixed_bytes(width: usize) -> Result<Self, DescriptorError> {
        if width == 0 {
            Err(DescriptorError::ZeroLengthBytes)
        } else {
            Ok(TypeDescriptor::Primitive(PrimitiveKind::FixedBytes(width)))
        }
    }

    pub fn bytes32() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::FixedBytes(32))
    }

    pub fn bytes48() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::FixedBytes(48))
    }

    pub fn bytes96() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::FixedBytes(96))
    }

    /// An unbounded list of `element`.
    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Arc::new(ListDescriptor::new(element, None)))
    }

    /// A list of `element` holding at most `max_len` items.
    pub fn bounded_list(element: TypeDescriptor, max_len: usize) -> Self {
        TypeDescriptor::List(Arc::new(ListDescriptor::new(element, Some(max_len))))
    }

    /// An unbounded byte string (a list of `uint8`).
    pub fn byte_list() -> Self {
        Self::list(Self::uint8())
    }

    pub fn record<I, S>(name: impl Into<String>, fields: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        RecordDescriptor::new(name, fields).map(|record| TypeDescriptor::Record(Arc::new(record)))
    }

    /// Returns `true` if every value of this type encodes to the same number of bytes.
    pub fn is_fixed_len(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(_) => true,
            TypeDescriptor::Record(record) => record.is_fixed_len(),
            TypeDescriptor::List(_) => false,
        }
    }

    /// The number of bytes this type occupies in the fixed portion of an enclosing record or
    /// list.
    ///
    /// For variable-size types this is `BYTES_PER_LENGTH_OFFSET`, the size of the offset that
    /// stands in for them.
    pub fn fixed_len(&self) -> usize {
        match self {
            TypeDescriptor::Primitive(kind) => kind.fixed_len(),
            TypeDescriptor::Record(record) if record.is_fixed_len() => record.fixed_part_len(),
            TypeDescriptor::Record(_) | TypeDescriptor::List(_) => BYTES_PER_LENGTH_OFFSET,
        }
    }

    /// Returns the record descriptor, if this is a record.
    pub fn as_record(&self) -> Option<&RecordDescriptor> {
        match self {
            TypeDescriptor::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the list descriptor, if this is a list.
    pub fn as_list(&self) -> Option<&ListDescriptor> {
        match self {
            TypeDescriptor::List(list) => Some(list),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{}", kind),
            TypeDescriptor::Record(record) => write!(f, "{}", record.name()),
            TypeDescriptor::List(list) => match list.max_len() {
                Some(max) => write!(f, "[{}; {}]", list.element(), max),
                None => write!(f, "[{}]", list.element()),
            },
        }
    }
}
