use thiserror::Error;

use crate::node::ResolveError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResultSetError {
    #[error("Result index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Unsupported result operation: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Resolver(#[from] ResolveError),
}
