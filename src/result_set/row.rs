use serde::Serialize;

use super::errors::ResultSetError;
use crate::node::NodeRef;

/// One materialized result row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    index: usize,
    node_id: i64,
    node_ref: Option<NodeRef>,
}

impl ResultRow {
    pub(crate) fn new(index: usize, node_id: i64, node_ref: Option<NodeRef>) -> Self {
        Self {
            index,
            node_id,
            node_ref,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    /// `None` when the node was deleted after the query ran
    pub fn node_ref(&self) -> Option<&NodeRef> {
        self.node_ref.as_ref()
    }

    /// Per-selector references need a multi-selector executor
    pub fn selector_node_ref(&self, selector: &str) -> Result<NodeRef, ResultSetError> {
        Err(ResultSetError::Unsupported(format!(
            "node reference for selector `{}`",
            selector
        )))
    }

    /// Scores come from full-text search, which the relational path never runs
    pub fn selector_score(&self, selector: &str) -> Result<f32, ResultSetError> {
        Err(ResultSetError::Unsupported(format!(
            "score for selector `{}`",
            selector
        )))
    }
}
