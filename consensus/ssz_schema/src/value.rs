use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A runtime instance of some `TypeDescriptor`.
///
/// Integers are held as `i128` so that values which do not fit the declared width (including
/// negative ones) can be represented and are rejected when encoding, rather than being
/// silently truncated when the `Value` is built.
///
/// A list of `uint8` is always carried as `Value::Bytes`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Value {
    Integer(i128),
    Bool(bool),
    Bytes(Vec<u8>),
    Record(BTreeMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn uint(value: u64) -> Self {
        Value::Integer(value.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// A byte string of `len` zeroes.
    pub fn zero_bytes(len: usize) -> Self {
        Value::Bytes(vec![0; len])
    }

    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// The default ("zero") value of `descriptor`: zero integers, `false`, zeroed byte
    /// strings, empty lists and records of defaults.
    pub fn default_for(descriptor: &TypeDescriptor) -> Self {
        match descriptor {
            TypeDescriptor::Primitive(PrimitiveKind::Bool) => Value::Bool(false),
            TypeDescriptor::Primitive(PrimitiveKind::FixedBytes(width)) => {
                Value::zero_bytes(*width)
            }
            TypeDescriptor::Primitive(_) => Value::Integer(0),
            TypeDescriptor::Record(record) => Value::Record(
                record
                    .fields()
                    .iter()
                    .map(|f| (f.name.clone(), Value::default_for(&f.descriptor)))
                    .collect(),
            ),
            TypeDescriptor::List(list) if list.is_byte_list() => Value::Bytes(vec![]),
            TypeDescriptor::List(_) => Value::List(vec![]),
        }
    }

    /// A short name for the variant, used in error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the field called `name` if `self` is a record.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|fields| fields.get(name))
    }

    /// Follows a dotted path of field names, e.g. `proposalData1.slot`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |value, segment| value.get(segment))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::uint(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// Integers are written as quoted decimal strings and bytes as `0x`-prefixed hex, matching the
/// conventions of the beacon node HTTP API.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Integer(i) => serializer.collect_str(i),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Bytes(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            Value::Record(fields) => fields.serialize(serializer),
            Value::List(items) => serializer.collect_seq(items),
        }
    }
}
