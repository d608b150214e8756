use crate::Error;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Selects the record definitions that make up a `SchemaRegistry`.
///
/// ```yaml
/// include_builtin: true
/// schema_files:
///   - /etc/schemas/shard_block.yaml
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Load the built-in beacon block catalog.
    pub include_builtin: bool,
    /// Further YAML files of record definitions, loaded after the built-in catalog.
    pub schema_files: Vec<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            schema_files: vec![],
        }
    }
}

impl RegistryConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        File::open(path)
            .map_err(|e| Error::UnableToReadFile(format!("Unable to open {:?}: {:?}", path, e)))
            .and_then(|file| {
                serde_yaml::from_reader(file).map_err(|e| {
                    Error::UnableToParseYaml(format!("Unable to parse {:?}: {:?}", path, e))
                })
            })
    }
}
