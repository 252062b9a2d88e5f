//! Store and node references
//!
//! External, addressable handles for rows in the repository. A node reference
//! renders as `protocol://identifier/id`, e.g.
//! `workspace://SpacesStore/2f1c…`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeRefError {
    #[error("Malformed store reference `{0}` (expected protocol://identifier)")]
    MalformedStoreRef(String),
    #[error("Malformed node reference `{0}` (expected protocol://identifier/id)")]
    MalformedNodeRef(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreRef {
    pub protocol: String,
    pub identifier: String,
}

impl StoreRef {
    pub fn new(protocol: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            identifier: identifier.into(),
        }
    }

    /// The default working store
    pub fn workspace() -> Self {
        Self::new("workspace", "SpacesStore")
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.identifier)
    }
}

impl FromStr for StoreRef {
    type Err = NodeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("://") {
            Some((protocol, identifier))
                if !protocol.is_empty() && !identifier.is_empty() && !identifier.contains('/') =>
            {
                Ok(StoreRef::new(protocol, identifier))
            }
            _ => Err(NodeRefError::MalformedStoreRef(s.to_string())),
        }
    }
}

impl TryFrom<String> for StoreRef {
    type Error = NodeRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StoreRef> for String {
    fn from(store: StoreRef) -> Self {
        store.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeRef {
    pub store: StoreRef,
    pub id: String,
}

impl NodeRef {
    pub fn new(store: StoreRef, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    /// New reference with a random v4 UUID id in the given store
    pub fn generate(store: StoreRef) -> Self {
        Self::new(store, uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = NodeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || NodeRefError::MalformedNodeRef(s.to_string());
        let (protocol, rest) = s.split_once("://").ok_or_else(malformed)?;
        let (identifier, id) = rest.split_once('/').ok_or_else(malformed)?;
        if protocol.is_empty() || identifier.is_empty() || id.is_empty() || id.contains('/') {
            return Err(malformed());
        }
        Ok(NodeRef::new(StoreRef::new(protocol, identifier), id))
    }
}

impl TryFrom<String> for NodeRef {
    type Error = NodeRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeRef> for String {
    fn from(node: NodeRef) -> Self {
        node.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_ref() {
        let node: NodeRef = "workspace://SpacesStore/abc-123".parse().unwrap();
        assert_eq!(node.store, StoreRef::workspace());
        assert_eq!(node.id, "abc-123");
        assert_eq!(node.to_string(), "workspace://SpacesStore/abc-123");
    }

    #[test]
    fn test_malformed_node_refs() {
        for bad in ["", "workspace", "workspace://SpacesStore", "://x/y", "a://b/c/d"] {
            assert!(bad.parse::<NodeRef>().is_err(), "expected `{}` to fail", bad);
        }
    }

    #[test]
    fn test_store_ref_serde_as_string() {
        let json = serde_json::to_string(&StoreRef::workspace()).unwrap();
        assert_eq!(json, "\"workspace://SpacesStore\"");
        let back: StoreRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StoreRef::workspace());
    }

    #[test]
    fn test_generated_refs_are_distinct() {
        let a = NodeRef::generate(StoreRef::workspace());
        let b = NodeRef::generate(StoreRef::workspace());
        assert_ne!(a, b);
        assert_eq!(a.id.len(), 36);
    }
}
