//! Qualified names
//!
//! A [`QName`] is a namespace URI plus a local name. Queries spell them either
//! in full (`{urn:eav:model:content:1.0}content`) or through a registered
//! prefix (`cm:content`).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::errors::DictionaryError;

pub const SYSTEM_MODEL_URI: &str = "urn:eav:model:system:1.0";
pub const SYSTEM_MODEL_PREFIX: &str = "sys";
pub const CONTENT_MODEL_URI: &str = "urn:eav:model:content:1.0";
pub const CONTENT_MODEL_PREFIX: &str = "cm";

lazy_static::lazy_static! {
    static ref QNAME_SYNTAX: Regex = Regex::new(
        r"^(?:\{(?P<uri>[^{}\s]+)\}|(?P<prefix>[A-Za-z_][\w-]*):)?(?P<local>[A-Za-z_][\w-]*)$"
    )
    .expect("qname regex is valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace_uri: String,
    pub local_name: String,
}

impl QName {
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
        }
    }

    pub fn system(local_name: &str) -> Self {
        Self::new(SYSTEM_MODEL_URI, local_name)
    }

    pub fn content(local_name: &str) -> Self {
        Self::new(CONTENT_MODEL_URI, local_name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace_uri, self.local_name)
    }
}

/// Syntactic pieces of a name as written, before prefix resolution
#[derive(Debug, Clone, PartialEq)]
pub enum NameSpelling<'a> {
    Full { uri: &'a str, local: &'a str },
    Prefixed { prefix: &'a str, local: &'a str },
    Local(&'a str),
}

impl<'a> NameSpelling<'a> {
    pub fn parse(name: &'a str) -> Result<Self, DictionaryError> {
        let caps = QNAME_SYNTAX
            .captures(name)
            .ok_or_else(|| DictionaryError::InvalidName(name.to_string()))?;
        let local = caps
            .name("local")
            .map(|m| m.as_str())
            .ok_or_else(|| DictionaryError::InvalidName(name.to_string()))?;
        if let Some(uri) = caps.name("uri") {
            Ok(NameSpelling::Full {
                uri: uri.as_str(),
                local,
            })
        } else if let Some(prefix) = caps.name("prefix") {
            Ok(NameSpelling::Prefixed {
                prefix: prefix.as_str(),
                local,
            })
        } else {
            Ok(NameSpelling::Local(local))
        }
    }

    pub fn local(&self) -> &'a str {
        match self {
            NameSpelling::Full { local, .. }
            | NameSpelling::Prefixed { local, .. }
            | NameSpelling::Local(local) => local,
        }
    }
}

/// Prefix ⇄ namespace URI table
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRegistry {
    prefixes: HashMap<String, String>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        let mut registry = Self {
            prefixes: HashMap::new(),
        };
        registry.register(SYSTEM_MODEL_PREFIX, SYSTEM_MODEL_URI);
        registry.register(CONTENT_MODEL_PREFIX, CONTENT_MODEL_URI);
        registry
    }
}

impl NamespaceRegistry {
    pub fn register(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn prefixes_for<'a>(&'a self, uri: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.prefixes
            .iter()
            .filter(move |(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Strict resolution: the prefix must be registered, bare local names are
    /// rejected.
    pub fn resolve(&self, name: &str) -> Result<QName, DictionaryError> {
        match NameSpelling::parse(name)? {
            NameSpelling::Full { uri, local } => Ok(QName::new(uri, local)),
            NameSpelling::Prefixed { prefix, local } => self
                .uri(prefix)
                .map(|uri| QName::new(uri, local))
                .ok_or_else(|| DictionaryError::UnknownPrefix(prefix.to_string())),
            NameSpelling::Local(_) => Err(DictionaryError::InvalidName(name.to_string())),
        }
    }

    /// Case-insensitive test of a written name against a concrete QName
    pub fn matches_ignore_case(&self, spelling: &NameSpelling<'_>, qname: &QName) -> bool {
        if !spelling.local().eq_ignore_ascii_case(&qname.local_name) {
            return false;
        }
        match spelling {
            NameSpelling::Full { uri, .. } => uri.eq_ignore_ascii_case(&qname.namespace_uri),
            NameSpelling::Prefixed { prefix, .. } => self
                .prefixes_for(&qname.namespace_uri)
                .any(|p| p.eq_ignore_ascii_case(prefix)),
            NameSpelling::Local(_) => true,
        }
    }
}
