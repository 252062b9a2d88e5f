//! Join accumulator
//!
//! Threaded by value through the collect-joins phase. Singleton categories
//! are deduplicated by category and qualified name so every predicate on the
//! same attribute shares one alias; multi-valued categories get a fresh alias
//! per request.

use indexmap::IndexMap;
use std::collections::HashMap;

use super::command::{JoinCategory, JoinDescriptor, NODE_ALIAS};

/// What a single leaf needs joined in order to be evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub category: JoinCategory,
    /// Qualified name the join is keyed on (singleton deduplication)
    pub key: String,
    pub qname_id: Option<i64>,
    pub outer: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinSet {
    singletons: IndexMap<String, JoinDescriptor>,
    multi_valued: Vec<JoinDescriptor>,
    counters: HashMap<JoinCategory, usize>,
}

impl JoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the alias the requesting leaf must use
    pub fn request(&mut self, request: &JoinRequest) -> String {
        if !request.category.is_materialized() {
            return NODE_ALIAS.to_string();
        }

        if request.category.is_singleton() {
            let key = format!("{}:{}", request.category.alias_prefix(), request.key);
            if let Some(existing) = self.singletons.get_mut(&key) {
                if request.outer && !existing.outer {
                    log::debug!("Promoting join {} to outer", existing.alias);
                    existing.outer = true;
                }
                return existing.alias.clone();
            }
            let descriptor = self.allocate(request);
            let alias = descriptor.alias.clone();
            self.singletons.insert(key, descriptor);
            alias
        } else {
            let descriptor = self.allocate(request);
            let alias = descriptor.alias.clone();
            self.multi_valued.push(descriptor);
            alias
        }
    }

    fn allocate(&mut self, request: &JoinRequest) -> JoinDescriptor {
        let counter = self.counters.entry(request.category).or_insert(0);
        *counter += 1;
        JoinDescriptor {
            category: request.category,
            alias: format!("{}_{}", request.category.alias_prefix(), counter),
            qname_id: request.qname_id,
            outer: request.outer,
        }
    }

    pub fn multi_valued_joins(&self) -> &[JoinDescriptor] {
        &self.multi_valued
    }

    /// Singleton joins in first-use order, then multi-valued joins
    pub fn into_descriptors(self) -> Vec<JoinDescriptor> {
        self.singletons
            .into_values()
            .chain(self.multi_valued)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.singletons.len() + self.multi_valued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
