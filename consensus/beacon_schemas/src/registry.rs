use crate::definition::{parse_definitions, RecordDefinition, TypeExpr, BYTE_LIST_NAME};
use crate::{Error, RegistryConfig};
use slog::{debug, info, Logger};
use ssz_schema::{DescriptorError, ListDescriptor, PrimitiveKind, TypeDescriptor};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// The built-in beacon block catalog, included in the binary.
pub const BEACON_BLOCK_SCHEMA: &str = include_str!("../schemas/beacon_block.yaml");

#[derive(Debug, PartialEq, Clone)]
pub enum RegistryError {
    /// Two definitions share a name.
    DuplicateType(String),
    /// A definition uses the name of a primitive (or `bytes`).
    ReservedName(String),
    /// A field refers to a type that is neither a primitive nor a defined record.
    UnknownType {
        record: String,
        field: String,
        type_name: String,
    },
    /// The records form a reference cycle, given in order with the first record repeated at
    /// the end, e.g. `[A, B, A]`.
    CyclicReference(Vec<String>),
    /// A definition was rejected by the descriptor constructor (empty record, duplicate field).
    InvalidDefinition(DescriptorError),
}

/// A read-only mapping from record name to its `TypeDescriptor`.
///
/// Built once (typically at startup) and then shared, e.g. behind an `Arc`.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, TypeDescriptor>,
}

impl SchemaRegistry {
    /// Resolves `definitions` into descriptors.
    ///
    /// Definitions may refer to each other in any order. References are resolved depth-first so
    /// that every record is built exactly once and shared by everything that embeds it.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = RecordDefinition>,
    {
        let mut by_name = BTreeMap::new();

        for definition in definitions {
            if is_reserved(&definition.name) {
                return Err(RegistryError::ReservedName(definition.name));
            }

            let name = definition.name.clone();
            if by_name.insert(name.clone(), definition).is_some() {
                return Err(RegistryError::DuplicateType(name));
            }
        }

        let mut resolver = Resolver {
            definitions: &by_name,
            resolved: BTreeMap::new(),
            stack: vec![],
        };

        for definition in by_name.values() {
            resolver.resolve_record(definition)?;
        }

        Ok(Self {
            types: resolver.resolved,
        })
    }

    /// Parses and resolves a YAML document of record definitions.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        let definitions =
            parse_definitions(yaml).map_err(|e| Error::UnableToParseYaml(format!("{:?}", e)))?;

        Ok(Self::from_definitions(definitions)?)
    }

    /// The records of the beacon block and everything a block embeds.
    pub fn beacon_block_catalog() -> Result<Self, Error> {
        Self::from_yaml_str(BEACON_BLOCK_SCHEMA)
    }

    /// Builds a registry from the built-in catalog (if enabled) and each of the configured schema
    /// files, in that order. A file may refer to records defined by the catalog or by any other
    /// file, but may not redefine them.
    pub fn from_config(config: &RegistryConfig, log: &Logger) -> Result<Self, Error> {
        let mut definitions = vec![];

        if config.include_builtin {
            let builtin = parse_definitions(BEACON_BLOCK_SCHEMA)
                .map_err(|e| Error::UnableToParseYaml(format!("built-in catalog: {:?}", e)))?;

            debug!(log, "Loaded built-in schemas"; "records" => builtin.len());
            definitions.extend(builtin);
        }

        for path in &config.schema_files {
            let loaded = load_definitions(path)?;

            debug!(
                log,
                "Loaded schema file";
                "path" => format!("{:?}", path),
                "records" => loaded.len()
            );
            definitions.extend(loaded);
        }

        let registry = Self::from_definitions(definitions)?;

        info!(
            log,
            "Schema registry ready";
            "records" => registry.len(),
            "builtin" => config.include_builtin,
            "files" => config.schema_files.len()
        );

        Ok(registry)
    }

    /// Returns the descriptor of the record called `name`.
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Record names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Reads a YAML file of record definitions.
pub fn load_definitions<P: AsRef<Path>>(path: P) -> Result<Vec<RecordDefinition>, Error> {
    let path = path.as_ref();

    let file = File::open(path)
        .map_err(|e| Error::UnableToReadFile(format!("Unable to open {:?}: {:?}", path, e)))?;

    serde_yaml::from_reader(file)
        .map_err(|e| Error::UnableToParseYaml(format!("Unable to parse {:?}: {:?}", path, e)))
}

fn is_reserved(name: &str) -> bool {
    name == BYTE_LIST_NAME || PrimitiveKind::from_name(name).is_some()
}

struct Resolver<'a> {
    definitions: &'a BTreeMap<String, RecordDefinition>,
    resolved: BTreeMap<String, TypeDescriptor>,
    /// Records currently being resolved, outermost first.
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn resolve_record(
        &mut self,
        definition: &'a RecordDefinition,
    ) -> Result<TypeDescriptor, RegistryError> {
        let name = definition.name.as_str();

        if let Some(descriptor) = self.resolved.get(name) {
            return Ok(descriptor.clone());
        }

        if let Some(position) = self.stack.iter().position(|n| n == name) {
            let mut cycle = self.stack[position..].to_vec();
            cycle.push(name.to_string());
            return Err(RegistryError::CyclicReference(cycle));
        }

        self.stack.push(name.to_string());

        let fields = definition
            .fields
            .iter()
            .map(|field| {
                self.resolve_expr(name, field.name(), field.type_expr())
                    .map(|descriptor| (field.name().to_string(), descriptor))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.stack.pop();

        let descriptor =
            TypeDescriptor::record(name, fields).map_err(RegistryError::InvalidDefinition)?;
        self.resolved.insert(name.to_string(), descriptor.clone());

        Ok(descriptor)
    }

    fn resolve_expr(
        &mut self,
        record: &str,
        field: &str,
        expr: &TypeExpr,
    ) -> Result<TypeDescriptor, RegistryError> {
        match expr {
            TypeExpr::Named(name) if name == BYTE_LIST_NAME => Ok(TypeDescriptor::byte_list()),
            TypeExpr::Named(name) => {
                let definitions = self.definitions;

                if let Some(kind) = PrimitiveKind::from_name(name) {
                    Ok(TypeDescriptor::Primitive(kind))
                } else if let Some(definition) = definitions.get(name) {
                    self.resolve_record(definition)
                } else {
                    Err(RegistryError::UnknownType {
                        record: record.to_string(),
                        field: field.to_string(),
                        type_name: name.clone(),
                    })
                }
            }
            TypeExpr::List { element, max_len } => {
                let element = self.resolve_expr(record, field, element)?;

                Ok(TypeDescriptor::List(Arc::new(ListDescriptor::new(
                    element, *max_len,
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(yaml: &str) -> Result<SchemaRegistry, RegistryError> {
        SchemaRegistry::from_definitions(parse_definitions(yaml).unwrap())
    }

    #[test]
    fn forward_references() {
        let registry = registry(
            r#"
- name: Outer
  fields:
    - [inner, Inner]
    - [inners, [Inner]]
- name: Inner
  fields:
    - [x, uint16]
"#,
        )
        .unwrap();

        let outer = registry.get("Outer").unwrap().as_record().unwrap();
        assert_eq!(outer.field("inner"), registry.get("Inner"));
        assert!(!outer.is_fixed_len());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Inner", "Outer"]);
    }

    #[test]
    fn duplicate_type() {
        assert_eq!(
            registry("- name: A\n  fields: [[x, uint8]]\n- name: A\n  fields: [[y, uint8]]\n"),
            Err(RegistryError::DuplicateType("A".into()))
        );
    }

    #[test]
    fn reserved_name() {
        assert_eq!(
            registry("- name: bytes32\n  fields: [[x, uint8]]\n"),
            Err(RegistryError::ReservedName("bytes32".into()))
        );
        assert_eq!(
            registry("- name: bytes\n  fields: [[x, uint8]]\n"),
            Err(RegistryError::ReservedName("bytes".into()))
        );
    }

    #[test]
    fn unknown_type() {
        assert_eq!(
            registry("- name: A\n  fields: [[x, [Missing]]]\n"),
            Err(RegistryError::UnknownType {
                record: "A".into(),
                field: "x".into(),
                type_name: "Missing".into()
            })
        );
    }

    #[test]
    fn cyclic_reference() {
        assert_eq!(
            registry(
                "- name: A\n  fields: [[b, B]]\n- name: B\n  fields: [[c, C]]\n- name: C\n  fields: [[a, [A]]]\n"
            ),
            Err(RegistryError::CyclicReference(vec![
                "A".into(),
                "B".into(),
                "C".into(),
                "A".into()
            ]))
        );
        assert_eq!(
            registry("- name: A\n  fields: [[a, A]]\n"),
            Err(RegistryError::CyclicReference(vec!["A".into(), "A".into()]))
        );
    }

    #[test]
    fn invalid_definitions() {
        assert_eq!(
            registry("- name: A\n  fields: []\n"),
            Err(RegistryError::InvalidDefinition(DescriptorError::EmptyRecord {
                record: "A".into()
            }))
        );
        assert_eq!(
            registry("- name: A\n  fields: [[x, uint8], [x, uint16]]\n"),
            Err(RegistryError::InvalidDefinition(
                DescriptorError::DuplicateField {
                    record: "A".into(),
                    field: "x".into()
                }
            ))
        );
    }

    #[test]
    fn catalog_sizes() {
        let registry = SchemaRegistry::beacon_block_catalog().unwrap();
        let fixed_len = |name: &str| {
            let descriptor = registry.get(name).unwrap();
            assert!(descriptor.is_fixed_len(), "{} should be fixed", name);
            descriptor.fixed_len()
        };

        assert_eq!(fixed_len("Eth1Data"), 64);
        assert_eq!(fixed_len("ProposalSignedData"), 48);
        assert_eq!(fixed_len("ProposerSlashing"), 8 + 48 + 96 + 48 + 96);
        assert_eq!(fixed_len("DepositInput"), 176);
        assert_eq!(fixed_len("DepositData"), 192);
        assert_eq!(fixed_len("VoluntaryExit"), 112);
        assert_eq!(fixed_len("Transfer"), 5 * 8 + 48 + 96);
        assert_eq!(fixed_len("AttestationData"), 8 * 2 + 32 * 3 + 40 + 8 + 32);

        for name in &[
            "Attestation",
            "SlashableAttestation",
            "AttesterSlashing",
            "Deposit",
            "BeaconBlockBody",
            "BeaconBlock",
            "CrosslinkCommittee",
        ] {
            assert!(!registry.get(name).unwrap().is_fixed_len(), "{}", name);
        }

        assert_eq!(registry.len(), 16);
    }
}
