//! YAML dictionary definitions
//!
//! ```yaml
//! namespaces:
//!   - prefix: ex
//!     uri: urn:example:model:1.0
//! classes:
//!   - name: cm:cmobject
//!     kind: type
//!   - name: ex:invoice
//!     kind: type
//!     parent: cm:cmobject
//!     properties:
//!       - name: ex:amount
//!         type: long
//! ids:              # optional; sequential ids are assigned when absent
//!   cm:cmobject: 10
//!   ex:invoice: 11
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::directory::InMemoryQNameDirectory;
use super::errors::DictionaryError;
use super::model::{ClassDefinition, ClassKind, DataTypeKind, PropertyDefinition};
use super::qname::NamespaceRegistry;
use super::registry::Dictionary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub prefix: String,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataTypeKind,
    #[serde(default)]
    pub multi_valued: bool,
}

fn default_include_in_super_type_query() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassConfig {
    pub name: String,
    pub kind: ClassKind,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_include_in_super_type_query")]
    pub include_in_super_type_query: bool,
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    #[serde(default)]
    pub namespaces: Vec<NamespaceConfig>,
    pub classes: Vec<ClassConfig>,
    #[serde(default)]
    pub ids: Option<BTreeMap<String, i64>>,
}

impl DictionaryConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, DictionaryError> {
        serde_yaml::from_str(content).map_err(|e| DictionaryError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, DictionaryError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| DictionaryError::ConfigReadError {
                error: format!("{}: {}", path.as_ref().display(), e),
            })?;
        Self::from_yaml_str(&content)
    }

    /// Build the dictionary and its id directory.
    ///
    /// Classes may be listed in any order; parents are registered before
    /// their children.
    pub fn build(&self) -> Result<(Dictionary, InMemoryQNameDirectory), DictionaryError> {
        let mut namespaces = NamespaceRegistry::default();
        for ns in &self.namespaces {
            namespaces.register(ns.prefix.clone(), ns.uri.clone());
        }

        let mut pending: Vec<ClassDefinition> = self
            .classes
            .iter()
            .map(|class| self.class_definition(&namespaces, class))
            .collect::<Result<_, _>>()?;

        let mut dictionary = Dictionary::new(namespaces.clone());
        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|class| {
                class
                    .parent
                    .as_ref()
                    .map_or(true, |parent| dictionary.class_defined(parent))
            });
            if ready.is_empty() {
                let names: Vec<String> = blocked.iter().map(|c| c.name.to_string()).collect();
                return Err(DictionaryError::invalid_config(format!(
                    "unresolvable parents for {:?}",
                    names
                )));
            }
            for class in ready {
                dictionary.add_class(class)?;
            }
            pending = blocked;
        }

        let directory = match &self.ids {
            Some(ids) => {
                let mut directory = InMemoryQNameDirectory::new();
                for (name, id) in ids {
                    directory.insert(namespaces.resolve(name)?, *id);
                }
                directory
            }
            None => InMemoryQNameDirectory::sequential(&dictionary),
        };

        log::info!(
            "📚 Loaded dictionary: {} classes, {} directory ids",
            dictionary.len(),
            directory.len()
        );
        Ok((dictionary, directory))
    }

    fn class_definition(
        &self,
        namespaces: &NamespaceRegistry,
        class: &ClassConfig,
    ) -> Result<ClassDefinition, DictionaryError> {
        let properties = class
            .properties
            .iter()
            .map(|p| {
                Ok(PropertyDefinition {
                    name: namespaces.resolve(&p.name)?,
                    data_type: p.data_type,
                    multi_valued: p.multi_valued,
                })
            })
            .collect::<Result<Vec<_>, DictionaryError>>()?;
        Ok(ClassDefinition {
            name: namespaces.resolve(&class.name)?,
            kind: class.kind,
            parent: class
                .parent
                .as_deref()
                .map(|parent| namespaces.resolve(parent))
                .transpose()?,
            include_in_super_type_query: class.include_in_super_type_query,
            properties,
        })
    }
}
