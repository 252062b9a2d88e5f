//! Row identifier ⇄ node reference resolution
//!
//! The relational executor hands back internal row ids; callers address rows
//! by [`NodeRef`]. Implementations of [`NodeResolver`] bridge the two, ideally
//! with a single round trip per batch.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use super::node_ref::{NodeRef, StoreRef};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("Node lookup failed: {0}")]
    Backend(String),
    #[error("Invalid node map: {0}")]
    NodeMap(String),
}

pub trait NodeResolver {
    /// Batched lookup. Ids that no longer exist are simply absent from the
    /// returned pairs.
    fn node_refs(&self, ids: &[i64]) -> Result<Vec<(i64, NodeRef)>, ResolveError>;

    /// Single-id lookup
    fn node_ref(&self, id: i64) -> Result<Option<NodeRef>, ResolveError>;

    /// Reverse lookup, used when a query names a node by reference
    fn node_id(&self, node: &NodeRef) -> Result<Option<i64>, ResolveError>;

    fn exists(&self, id: i64) -> Result<bool, ResolveError> {
        Ok(self.node_ref(id)?.is_some())
    }
}

/// Hash-map backed resolver, used by the CLI and in tests
///
/// The CLI loads it from a YAML (or JSON) mapping of row id to node
/// reference:
///
/// ```yaml
/// 12: workspace://SpacesStore/invoices-folder
/// 13: workspace://SpacesStore/invoice-0001
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryNodeResolver {
    by_id: HashMap<i64, NodeRef>,
    by_ref: HashMap<NodeRef, i64>,
}

impl InMemoryNodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64, node: NodeRef) {
        if let Some(previous) = self.by_id.insert(id, node.clone()) {
            self.by_ref.remove(&previous);
        }
        self.by_ref.insert(node, id);
    }

    /// Register `id` under a freshly generated reference in `store`
    pub fn insert_generated(&mut self, id: i64, store: &StoreRef) -> NodeRef {
        let node = NodeRef::generate(store.clone());
        self.insert(id, node.clone());
        node
    }

    /// Simulates a concurrent delete
    pub fn remove(&mut self, id: i64) -> Option<NodeRef> {
        let node = self.by_id.remove(&id)?;
        self.by_ref.remove(&node);
        Some(node)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ResolveError> {
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(content).map_err(|e| ResolveError::NodeMap(e.to_string()))?;
        let mut resolver = Self::new();
        for (key, value) in &mapping {
            // JSON object keys arrive as strings
            let id = key
                .as_i64()
                .or_else(|| key.as_str().and_then(|text| text.trim().parse().ok()))
                .ok_or_else(|| ResolveError::NodeMap(format!("row id {:?} is not an integer", key)))?;
            let node = value
                .as_str()
                .ok_or_else(|| ResolveError::NodeMap(format!("row {} has no node reference", id)))?
                .trim()
                .parse::<NodeRef>()
                .map_err(|e| ResolveError::NodeMap(format!("row {}: {}", id, e)))?;
            resolver.insert(id, node);
        }
        log::debug!("Loaded {} node reference(s)", resolver.len());
        Ok(resolver)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ResolveError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ResolveError::NodeMap(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl NodeResolver for InMemoryNodeResolver {
    fn node_refs(&self, ids: &[i64]) -> Result<Vec<(i64, NodeRef)>, ResolveError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|node| (*id, node.clone())))
            .collect())
    }

    fn node_ref(&self, id: i64) -> Result<Option<NodeRef>, ResolveError> {
        Ok(self.by_id.get(&id).cloned())
    }

    fn node_id(&self, node: &NodeRef) -> Result<Option<i64>, ResolveError> {
        Ok(self.by_ref.get(node).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_lookup_skips_missing_ids() {
        let mut resolver = InMemoryNodeResolver::new();
        let store = StoreRef::workspace();
        let a = resolver.insert_generated(1, &store);
        let c = resolver.insert_generated(3, &store);

        let found = resolver.node_refs(&[1, 2, 3]).unwrap();
        assert_eq!(found, vec![(1, a.clone()), (3, c)]);
        assert_eq!(resolver.node_id(&a).unwrap(), Some(1));
        assert!(!resolver.exists(2).unwrap());
    }

    #[test]
    fn test_reinsert_replaces_reverse_mapping() {
        let mut resolver = InMemoryNodeResolver::new();
        let store = StoreRef::workspace();
        let old = resolver.insert_generated(7, &store);
        let new = resolver.insert_generated(7, &store);

        assert_eq!(resolver.node_id(&old).unwrap(), None);
        assert_eq!(resolver.node_id(&new).unwrap(), Some(7));
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_node_map_from_yaml_and_json() {
        let yaml = InMemoryNodeResolver::from_yaml_str(
            "12: workspace://SpacesStore/folder\n13: workspace://SpacesStore/invoice-1\n",
        )
        .unwrap();
        let folder: NodeRef = "workspace://SpacesStore/folder".parse().unwrap();
        assert_eq!(yaml.len(), 2);
        assert_eq!(yaml.node_id(&folder).unwrap(), Some(12));

        let json =
            InMemoryNodeResolver::from_yaml_str(r#"{"12": "workspace://SpacesStore/folder"}"#)
                .unwrap();
        assert_eq!(json.node_ref(12).unwrap(), Some(folder));
    }

    #[test]
    fn test_node_map_rejects_bad_entries() {
        for content in [
            "twelve: workspace://SpacesStore/folder\n",
            "12: not-a-reference\n",
            "12: [workspace://SpacesStore/folder]\n",
            "- 12\n",
        ] {
            assert!(
                matches!(
                    InMemoryNodeResolver::from_yaml_str(content),
                    Err(ResolveError::NodeMap(_))
                ),
                "accepted {:?}",
                content
            );
        }
    }
}
