//! Query-tree → relational command lowering
//!
//! Entry point is [`lower_query`]. The output is a [`LoweredQuery`]: join
//! descriptors over the EAV tables plus a flat predicate token stream that a
//! relational executor can turn into SQL for its own dialect.

pub mod command;
pub mod constraint;
pub mod errors;
pub mod field_mapping;
pub mod join_collector;
pub mod ordering;
pub mod property;
pub mod query;
pub mod selector;
pub mod value_conversion;


use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub use command::{
    render_predicate, CommandValue, DbOperator, JoinCategory, JoinDescriptor, LeafCommand,
    PredicateToken, ScalarValue, TextFunction, NODE_ALIAS, NO_MATCH_ID,
};
pub use constraint::is_supported;
pub use errors::LoweringError;
pub use join_collector::JoinSet;
pub use query::lower_query;

use crate::dictionary::SchemaContext;
use crate::node::StoreRef;

/// Everything the relational executor needs to run one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoweredQuery {
    pub joins: Vec<JoinDescriptor>,
    pub predicate: Vec<PredicateToken>,
    pub order_by: Vec<LeafCommand>,
    /// Store scope in tenant-neutral form
    pub store: StoreRef,
    /// Type id of `sys:deleted`, set when deleted rows must be excluded
    pub deleted_type_id: Option<i64>,
    pub since_txn_id: Option<i64>,
    pub has_predicate: bool,
    pub has_ordering: bool,
}

impl fmt::Display for LoweredQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STORE {}", self.store)?;
        for join in &self.joins {
            writeln!(
                f,
                "{} JOIN {:?} AS {}{}",
                if join.outer { "LEFT OUTER" } else { "INNER" },
                join.category,
                join.alias,
                join.qname_id
                    .map(|id| format!(" ON qname_id = {}", id))
                    .unwrap_or_default()
            )?;
        }
        if self.has_predicate {
            writeln!(f, "WHERE {}", render_predicate(&self.predicate))?;
        }
        if let Some(id) = self.deleted_type_id {
            writeln!(f, "EXCLUDING TYPE {}", id)?;
        }
        if let Some(txn) = self.since_txn_id {
            writeln!(f, "SINCE TXN {}", txn)?;
        }
        if self.has_ordering {
            let keys: Vec<String> = self.order_by.iter().map(|leaf| leaf.to_string()).collect();
            writeln!(f, "ORDER BY {}", keys.join(", "))?;
        }
        Ok(())
    }
}

/// Schema access plus the selectors in scope for one query
#[derive(Debug, Clone)]
pub struct LoweringContext<'a> {
    pub schema: SchemaContext<'a>,
    selectors: BTreeSet<String>,
    pub store: StoreRef,
}

impl<'a> LoweringContext<'a> {
    pub fn new(
        schema: SchemaContext<'a>,
        selectors: impl IntoIterator<Item = String>,
        store: StoreRef,
    ) -> Self {
        Self {
            schema,
            selectors: selectors.into_iter().collect(),
            store,
        }
    }

    pub fn check_selector(&self, alias: &str) -> Result<(), LoweringError> {
        if self.selectors.contains(alias) {
            Ok(())
        } else {
            Err(LoweringError::UnknownSelector(alias.to_string()))
        }
    }
}
