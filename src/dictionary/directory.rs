//! Qualified-name → persisted id directory
//!
//! Rows reference classes and attributes by numeric id. A QName that was
//! never persisted has no id, which means no row can use it yet. Lookups
//! therefore return `None` rather than failing.

use std::collections::HashMap;

use super::qname::QName;
use super::registry::DictionaryService;

pub trait QNameDirectory {
    fn id(&self, qname: &QName) -> Option<i64>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryQNameDirectory {
    ids: HashMap<QName, i64>,
}

impl InMemoryQNameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qname: QName, id: i64) {
        self.ids.insert(qname, id);
    }

    /// Assigns ids 1.. to every class, then every property, in declaration
    /// order, plus the built-in `sys:deleted` type.
    pub fn sequential(dictionary: &dyn DictionaryService) -> Self {
        let mut directory = Self::new();
        let mut next = 1;
        let class_names = dictionary.all_classes().into_iter().map(|c| &c.name);
        let property_names = dictionary.all_properties().into_iter().map(|p| &p.name);
        for qname in class_names.chain(property_names) {
            directory.insert(qname.clone(), next);
            next += 1;
        }
        let deleted = QName::system(super::DELETED_TYPE_LOCAL_NAME);
        if directory.id(&deleted).is_none() {
            directory.insert(deleted, next);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl QNameDirectory for InMemoryQNameDirectory {
    fn id(&self, qname: &QName) -> Option<i64> {
        self.ids.get(qname).copied()
    }
}
