//! Record definitions for the beacon block (and everything a block embeds), a registry that
//! resolves such definitions into `ssz_schema` descriptors, and `SszCodec`, which encodes and
//! decodes registered records by name.
//!
//! Definitions are data: the built-in catalog is a YAML file compiled into the binary, and
//! further definitions may be loaded from files named in a `RegistryConfig`.
mod codec;
mod config;
pub mod definition;
mod registry;

pub use codec::SszCodec;
pub use config::RegistryConfig;
pub use definition::{FieldDefinition, RecordDefinition, TypeExpr};
pub use registry::{load_definitions, RegistryError, SchemaRegistry, BEACON_BLOCK_SCHEMA};
pub use ssz_schema::{DecodeError, EncodeError, TypeDescriptor, Value};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    Encode(EncodeError),
    Decode(DecodeError),
    Registry(RegistryError),
    /// No record of this name is registered.
    UnknownType(String),
    UnableToReadFile(String),
    UnableToParseYaml(String),
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}
