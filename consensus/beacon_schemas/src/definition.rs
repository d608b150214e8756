//! The serde-able file format for record definitions.
//!
//! ```yaml
//! - name: Deposit
//!   fields:
//!     - [branch, [bytes32]]
//!     - [index, uint64]
//!     - [depositData, DepositData]
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name used in schema files for a list of `uint8`.
pub const BYTE_LIST_NAME: &str = "bytes";

/// One named record and its ordered fields.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

/// A `[name, type]` pair.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FieldDefinition(pub String, pub TypeExpr);

impl FieldDefinition {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn type_expr(&self) -> &TypeExpr {
        &self.1
    }
}

/// A reference to a type from within a field definition.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTypeExpr", into = "RawTypeExpr")]
pub enum TypeExpr {
    /// A primitive, `bytes` or the name of a record.
    Named(String),
    /// `[T]` or `{list: T, max_len: N}`.
    List {
        element: Box<TypeExpr>,
        max_len: Option<usize>,
    },
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::List {
            element: Box::new(element),
            max_len: None,
        }
    }

    pub fn bounded_list(element: TypeExpr, max_len: usize) -> Self {
        TypeExpr::List {
            element: Box::new(element),
            max_len: Some(max_len),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::List {
                element,
                max_len: None,
            } => write!(f, "[{}]", element),
            TypeExpr::List {
                element,
                max_len: Some(max_len),
            } => write!(f, "{{list: {}, max_len: {}}}", element, max_len),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoundedList {
    list: Box<TypeExpr>,
    max_len: usize,
}

/// The shapes a type expression may take in a file, before the list form is validated.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawTypeExpr {
    Named(String),
    List(Vec<TypeExpr>),
    Bounded(BoundedList),
}

impl TryFrom<RawTypeExpr> for TypeExpr {
    type Error = String;

    fn try_from(raw: RawTypeExpr) -> Result<Self, Self::Error> {
        match raw {
            RawTypeExpr::Named(name) => Ok(TypeExpr::Named(name)),
            RawTypeExpr::List(mut elements) => {
                if elements.len() == 1 {
                    Ok(TypeExpr::list(elements.remove(0)))
                } else {
                    Err(format!(
                        "a list type must name exactly one element type, found {}",
                        elements.len()
                    ))
                }
            }
            RawTypeExpr::Bounded(BoundedList { list, max_len }) => Ok(TypeExpr::List {
                element: list,
                max_len: Some(max_len),
            }),
        }
    }
}

impl From<TypeExpr> for RawTypeExpr {
    fn from(expr: TypeExpr) -> Self {
        match expr {
            TypeExpr::Named(name) => RawTypeExpr::Named(name),
            TypeExpr::List {
                element,
                max_len: None,
            } => RawTypeExpr::List(vec![*element]),
            TypeExpr::List {
                element,
                max_len: Some(max_len),
            } => RawTypeExpr::Bounded(BoundedList {
                list: element,
                max_len,
            }),
        }
    }
}

/// Parses a YAML sequence of record definitions.
pub fn parse_definitions(yaml: &str) -> Result<Vec<RecordDefinition>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_type_forms() {
        let yaml = r#"
- name: Attestation
  fields:
    - [aggregationBitfield, bytes]
    - [data, AttestationData]
    - [indices, [uint64]]
    - [roots, {list: bytes32, max_len: 4}]
    - [nested, [[uint16]]]
"#;

        let definitions = parse_definitions(yaml).unwrap();

        assert_eq!(
            definitions,
            vec![RecordDefinition {
                name: "Attestation".into(),
                fields: vec![
                    FieldDefinition("aggregationBitfield".into(), TypeExpr::named("bytes")),
                    FieldDefinition("data".into(), TypeExpr::named("AttestationData")),
                    FieldDefinition("indices".into(), TypeExpr::list(TypeExpr::named("uint64"))),
                    FieldDefinition(
                        "roots".into(),
                        TypeExpr::bounded_list(TypeExpr::named("bytes32"), 4)
                    ),
                    FieldDefinition(
                        "nested".into(),
                        TypeExpr::list(TypeExpr::list(TypeExpr::named("uint16")))
                    ),
                ],
            }]
        );
    }

    #[test]
    fn list_needs_one_element_type() {
        assert!(parse_definitions("- name: A\n  fields:\n    - [a, []]\n").is_err());
        assert!(parse_definitions("- name: A\n  fields:\n    - [a, [uint8, uint16]]\n").is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(parse_definitions("- name: A\n  feilds: []\n").is_err());
        assert!(
            parse_definitions("- name: A\n  fields:\n    - [a, {list: uint8, max: 4}]\n").is_err()
        );
    }

    #[test]
    fn yaml_round_trip() {
        let definition = RecordDefinition {
            name: "CrosslinkCommittee".into(),
            fields: vec![
                FieldDefinition("shard".into(), TypeExpr::named("uint64")),
                FieldDefinition(
                    "validatorIndices".into(),
                    TypeExpr::bounded_list(TypeExpr::named("uint64"), 1024),
                ),
            ],
        };

        let yaml = serde_yaml::to_string(&vec![definition.clone()]).unwrap();

        assert_eq!(parse_definitions(&yaml).unwrap(), vec![definition]);
    }

    #[test]
    fn display() {
        assert_eq!(
            TypeExpr::list(TypeExpr::bounded_list(TypeExpr::named("bytes32"), 2)).to_string(),
            "[{list: bytes32, max_len: 2}]"
        );
    }
}
