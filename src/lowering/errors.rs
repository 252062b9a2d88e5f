use thiserror::Error;

use crate::dictionary::{DataTypeKind, DictionaryError};
use crate::node::{NodeRefError, ResolveError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoweringError {
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error("Disjunction is not supported by the relational backend")]
    UnsupportedDisjunction,

    #[error("Empty conjunction (must contain at least one constraint)")]
    EmptyConjunction,

    #[error("Unknown function `{0}`")]
    UnknownFunction(String),

    #[error("Function `{0}` has no relational lowering")]
    UnsupportedFunction(String),

    #[error("Unsupported property type `{data_type}` for property `{property}`")]
    UnsupportedPropertyType {
        property: String,
        data_type: DataTypeKind,
    },

    #[error("Ordering by `{0}` is not supported")]
    UnsupportedOrdering(String),

    #[error("Unsupported selector join: {0}")]
    UnsupportedJoin(String),

    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("Function `{function}` is missing argument `{argument}`")]
    MissingArgument { function: String, argument: String },

    #[error("Invalid argument `{argument}` for function `{function}`: {reason}")]
    InvalidArgument {
        function: String,
        argument: String,
        reason: String,
    },

    #[error("Unknown selector `{0}`")]
    UnknownSelector(String),

    #[error("Duplicate selector alias `{0}`")]
    DuplicateSelector(String),

    #[error("Cannot convert `{value}` to {target} for property `{property}`")]
    Conversion {
        property: String,
        value: String,
        target: DataTypeKind,
    },

    #[error("Property `{0}` is not queryable")]
    NotQueryable(String),

    #[error("Property `{0}` is not orderable")]
    NotOrderable(String),

    #[error("Invalid object id `{0}`")]
    InvalidObjectId(String),

    #[error("Query references nodes by id but no node resolver is available")]
    MissingNodeResolver,

    #[error("Node lookup failed: {0}")]
    NodeLookup(String),
}

impl LoweringError {
    pub fn missing_argument(function: &str, argument: &str) -> Self {
        LoweringError::MissingArgument {
            function: function.to_string(),
            argument: argument.to_string(),
        }
    }

    pub fn invalid_argument(function: &str, argument: &str, reason: impl Into<String>) -> Self {
        LoweringError::InvalidArgument {
            function: function.to_string(),
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedConstruct error with context information
    pub fn unsupported_with_context(what: impl Into<String>, context: impl Into<String>) -> Self {
        LoweringError::UnsupportedConstruct(format!("{}\n  Context: {}", what.into(), context.into()))
    }
}

impl From<ResolveError> for LoweringError {
    fn from(err: ResolveError) -> Self {
        LoweringError::NodeLookup(err.to_string())
    }
}

impl From<NodeRefError> for LoweringError {
    fn from(err: NodeRefError) -> Self {
        match err {
            NodeRefError::MalformedNodeRef(value) | NodeRefError::MalformedStoreRef(value) => {
                LoweringError::InvalidObjectId(value)
            }
        }
    }
}
