//! # Dictionary Error Types
//!
//! Errors raised while resolving class and namespace names against the
//! dictionary, and while loading a dictionary definition from YAML.
//!
//! Unknown *properties* are not errors at this layer: property resolution
//! returns `None` and the lowering layer applies its not-found policy.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DictionaryError {
    #[error("Invalid qualified name `{0}`")]
    InvalidName(String),
    #[error("Unknown namespace prefix `{0}`")]
    UnknownPrefix(String),
    #[error("No class definition found for `{0}`")]
    UnknownClass(String),
    #[error("Ambiguous class name `{name}` matches {candidates:?}")]
    AmbiguousClass {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Failed to read dictionary file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse dictionary: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid dictionary: {message}")]
    InvalidConfig { message: String },
}

impl DictionaryError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        DictionaryError::InvalidConfig {
            message: message.into(),
        }
    }
}
