use crate::{Error, SchemaRegistry};
use slog::{debug, Logger};
use ssz_schema::{TypeDescriptor, Value};
use std::sync::Arc;

/// Encodes and decodes registered records by name.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct SszCodec {
    registry: Arc<SchemaRegistry>,
    log: Logger,
}

impl SszCodec {
    pub fn new(registry: Arc<SchemaRegistry>, log: Logger) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Returns the descriptor of the record called `type_name`.
    pub fn descriptor(&self, type_name: &str) -> Result<&TypeDescriptor, Error> {
        self.registry
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// The default value of the record called `type_name`.
    pub fn default_value(&self, type_name: &str) -> Result<Value, Error> {
        self.descriptor(type_name).map(Value::default_for)
    }

    pub fn encode(&self, type_name: &str, value: &Value) -> Result<Vec<u8>, Error> {
        let descriptor = self.descriptor(type_name)?;

        match ssz_schema::encode(descriptor, value) {
            Ok(bytes) => {
                debug!(
                    self.log,
                    "Encoded record";
                    "type" => type_name,
                    "bytes" => bytes.len()
                );
                Ok(bytes)
            }
            Err(e) => {
                debug!(
                    self.log,
                    "Unable to encode record";
                    "type" => type_name,
                    "path" => e.path(),
                    "error" => ?e.root_cause()
                );
                Err(e.into())
            }
        }
    }

    /// Decodes `bytes`, which must hold exactly one `type_name` record.
    pub fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<Value, Error> {
        let descriptor = self.descriptor(type_name)?;

        match ssz_schema::decode_exact(descriptor, bytes) {
            Ok(value) => {
                debug!(
                    self.log,
                    "Decoded record";
                    "type" => type_name,
                    "bytes" => bytes.len()
                );
                Ok(value)
            }
            Err(e) => {
                debug!(
                    self.log,
                    "Unable to decode record";
                    "type" => type_name,
                    "bytes" => bytes.len(),
                    "path" => e.path(),
                    "error" => ?e.root_cause()
                );
                Err(e.into())
            }
        }
    }
}
