//! Abstract query tree
//!
//! Backend-agnostic representation produced by the filter-language parser:
//! selectors over types and aspects, a constraint tree, orderings, and the
//! query-level scope. Function names are kept as written; the lowering layer
//! looks them up in its own registry.

pub mod constraint;
pub mod function_registry;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use constraint::{Argument, Constraint, LiteralValue};
pub use function_registry::{args, get_function, Function, FunctionRole};

use crate::node::StoreRef;

/// Binds an alias to one registered type or aspect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub alias: String,
    #[serde(rename = "class")]
    pub class_name: String,
}

impl Selector {
    pub fn new(alias: &str, class_name: &str) -> Self {
        Self {
            alias: alias.to_string(),
            class_name: class_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCondition {
    pub left_selector: String,
    pub left_property: String,
    pub right_selector: String,
    pub right_property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Selector(Selector),
    Join {
        left: Box<Source>,
        right: Box<Source>,
        #[serde(default)]
        join_type: JoinType,
        condition: JoinCondition,
    },
}

impl Source {
    pub fn selector(alias: &str, class_name: &str) -> Self {
        Source::Selector(Selector::new(alias, class_name))
    }

    /// Every selector reachable from this source, left to right
    pub fn selectors(&self) -> Vec<&Selector> {
        match self {
            Source::Selector(selector) => vec![selector],
            Source::Join { left, right, .. } => {
                let mut selectors = left.selectors();
                selectors.extend(right.selectors());
                selectors
            }
        }
    }
}

/// Output column or ordering key: a function applied to named arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub alias: String,
    pub function: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, Argument>,
}

impl Column {
    /// `PropertyAccessor(property)` column
    pub fn property(alias: &str, selector: &str, property: &str) -> Self {
        Self {
            alias: alias.to_string(),
            function: "PropertyAccessor".to_string(),
            arguments: BTreeMap::from([(
                "property".to_string(),
                Argument::property(selector, property),
            )]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    pub fn keyword(&self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub column: Column,
    pub order: Order,
}

impl Ordering {
    pub fn new(column: Column, order: Order) -> Self {
        Self { column, order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub columns: Vec<Column>,
    pub source: Source,
    #[serde(default)]
    pub constraint: Option<Constraint>,
    #[serde(default)]
    pub orderings: Option<Vec<Ordering>>,
    #[serde(default = "StoreRef::workspace")]
    pub store: StoreRef,
    /// Exclude rows whose type is the system "deleted" marker type
    #[serde(default)]
    pub exclude_deleted: bool,
    /// Only rows changed after this transaction id
    #[serde(default)]
    pub since_txn_id: Option<i64>,
}

impl Query {
    pub fn new(source: Source) -> Self {
        Self {
            columns: Vec::new(),
            source,
            constraint: None,
            orderings: None,
            store: StoreRef::workspace(),
            exclude_deleted: false,
            since_txn_id: None,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_orderings(mut self, orderings: Vec<Ordering>) -> Self {
        self.orderings = Some(orderings);
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn in_store(mut self, store: StoreRef) -> Self {
        self.store = store;
        self
    }

    pub fn excluding_deleted(mut self) -> Self {
        self.exclude_deleted = true;
        self
    }

    pub fn since_txn(mut self, txn_id: i64) -> Self {
        self.since_txn_id = Some(txn_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_selectors_in_order() {
        let source = Source::Join {
            left: Box::new(Source::selector("d", "cm:content")),
            right: Box::new(Source::selector("t", "cm:titled")),
            join_type: JoinType::Inner,
            condition: JoinCondition {
                left_selector: "d".to_string(),
                left_property: "sys:node-id".to_string(),
                right_selector: "t".to_string(),
                right_property: "sys:node-id".to_string(),
            },
        };
        let aliases: Vec<&str> = source.selectors().iter().map(|s| s.alias.as_str()).collect();
        assert_eq!(aliases, vec!["d", "t"]);
    }

    #[test]
    fn test_minimal_query_json() {
        let query: Query =
            serde_json::from_str(r#"{"source": {"selector": {"alias": "d", "class": "cm:content"}}}"#)
                .unwrap();
        assert_eq!(query, Query::new(Source::selector("d", "cm:content")));
        assert_eq!(query.store.to_string(), "workspace://SpacesStore");
    }
}
