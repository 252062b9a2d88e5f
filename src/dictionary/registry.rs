//! In-memory class and property registry
//!
//! [`DictionaryService`] is the read-only view the resolver needs: class and
//! property lookup, direct sub-classes, and namespace prefixes. [`Dictionary`]
//! is the bundled implementation, built programmatically or from YAML (see
//! [`super::config`]).

use std::collections::HashMap;

use super::errors::DictionaryError;
use super::model::{ClassDefinition, ClassKind, DataTypeKind, PropertyDefinition};
use super::qname::{NamespaceRegistry, QName};

pub trait DictionaryService {
    fn namespaces(&self) -> &NamespaceRegistry;

    fn class(&self, name: &QName) -> Option<&ClassDefinition>;

    fn property(&self, name: &QName) -> Option<&PropertyDefinition>;

    /// Direct children of `name` (sub-types of a type, sub-aspects of an aspect)
    fn sub_classes(&self, name: &QName) -> Vec<&QName>;

    fn all_classes(&self) -> Vec<&ClassDefinition>;

    fn all_properties(&self) -> Vec<&PropertyDefinition>;
}

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    namespaces: NamespaceRegistry,
    classes: HashMap<QName, ClassDefinition>,
    properties: HashMap<QName, PropertyDefinition>,
    children: HashMap<QName, Vec<QName>>,
    /// Declaration order, so iteration is deterministic
    class_order: Vec<QName>,
}

impl Dictionary {
    pub fn new(namespaces: NamespaceRegistry) -> Self {
        Self {
            namespaces,
            ..Default::default()
        }
    }

    /// Register a class. Parents must be registered first and must have the
    /// same kind.
    pub fn add_class(&mut self, class: ClassDefinition) -> Result<(), DictionaryError> {
        if self.classes.contains_key(&class.name) {
            return Err(DictionaryError::invalid_config(format!(
                "duplicate class `{}`",
                class.name
            )));
        }
        if let Some(parent) = &class.parent {
            let parent_def = self.classes.get(parent).ok_or_else(|| {
                DictionaryError::invalid_config(format!(
                    "class `{}` declares unknown parent `{}`",
                    class.name, parent
                ))
            })?;
            if parent_def.kind != class.kind {
                return Err(DictionaryError::invalid_config(format!(
                    "class `{}` and its parent `{}` differ in kind",
                    class.name, parent
                )));
            }
            self.children
                .entry(parent.clone())
                .or_default()
                .push(class.name.clone());
        }
        for property in &class.properties {
            if self.properties.contains_key(&property.name) {
                return Err(DictionaryError::invalid_config(format!(
                    "property `{}` is declared twice",
                    property.name
                )));
            }
            self.properties
                .insert(property.name.clone(), property.clone());
        }
        self.class_order.push(class.name.clone());
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    /// Test and builder helper: a class with no properties
    pub fn define(
        &mut self,
        name: QName,
        kind: ClassKind,
        parent: Option<QName>,
        include_in_super_type_query: bool,
    ) -> Result<(), DictionaryError> {
        self.add_class(ClassDefinition {
            name,
            kind,
            parent,
            include_in_super_type_query,
            properties: Vec::new(),
        })
    }

    /// Test and builder helper: attach a property to an existing class
    pub fn define_property(
        &mut self,
        class: &QName,
        name: QName,
        data_type: DataTypeKind,
        multi_valued: bool,
    ) -> Result<(), DictionaryError> {
        if self.properties.contains_key(&name) {
            return Err(DictionaryError::invalid_config(format!(
                "property `{}` is declared twice",
                name
            )));
        }
        let definition = PropertyDefinition {
            name: name.clone(),
            data_type,
            multi_valued,
        };
        let class_def = self.classes.get_mut(class).ok_or_else(|| {
            DictionaryError::invalid_config(format!(
                "property `{}` attached to unknown class `{}`",
                name, class
            ))
        })?;
        class_def.properties.push(definition.clone());
        self.properties.insert(name, definition);
        Ok(())
    }

    pub fn class_defined(&self, name: &QName) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl DictionaryService for Dictionary {
    fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    fn class(&self, name: &QName) -> Option<&ClassDefinition> {
        self.classes.get(name)
    }

    fn property(&self, name: &QName) -> Option<&PropertyDefinition> {
        self.properties.get(name)
    }

    fn sub_classes(&self, name: &QName) -> Vec<&QName> {
        self.children
            .get(name)
            .map(|children| children.iter().collect())
            .unwrap_or_default()
    }

    fn all_classes(&self) -> Vec<&ClassDefinition> {
        self.class_order
            .iter()
            .filter_map(|name| self.classes.get(name))
            .collect()
    }

    fn all_properties(&self) -> Vec<&PropertyDefinition> {
        self.all_classes()
            .into_iter()
            .flat_map(|class| class.properties.iter())
            .collect()
    }
}
