//! Selector lowering: type and aspect membership tests
//!
//! A type test is a plain `IN` on the node row's `type_qname_id`. An aspect
//! test needs a fresh aspect-presence join and tests its `qname_id`. Both use
//! the sentinel id instead of an empty list when no class in the closure has
//! been persisted yet.

use super::command::{
    CommandValue, DbOperator, JoinCategory, LeafCommand, PredicateToken, NODE_ALIAS, NO_MATCH_ID,
};
use super::errors::LoweringError;
use super::field_mapping::PhysicalColumn;
use super::join_collector::{JoinRequest, JoinSet};
use crate::dictionary::{resolve_class, ClassKind, QName, ResolvedClass, SchemaContext};
use crate::query_model::Selector;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeTest {
    pub class: QName,
    pub kind: ClassKind,
    pub ids: Vec<i64>,
    pub negated: bool,
}

impl TypeTest {
    pub fn from_class(class: ResolvedClass) -> Self {
        Self {
            class: class.name,
            kind: class.kind,
            ids: class.ids.into_iter().collect(),
            negated: false,
        }
    }

    /// Type test over an explicit id set (synthetic type-id comparisons)
    pub fn for_type_ids(class: QName, ids: Vec<i64>, negated: bool) -> Self {
        Self {
            class,
            kind: ClassKind::Type,
            ids,
            negated,
        }
    }

    fn values(&self) -> CommandValue {
        if self.ids.is_empty() {
            log::debug!("No persisted ids for {}, using sentinel", self.class);
            CommandValue::ids([NO_MATCH_ID])
        } else {
            CommandValue::ids(self.ids.iter().copied())
        }
    }

    pub fn collect_joins(self, mut joins: JoinSet) -> (LeafCommand, JoinSet) {
        let operator = if self.negated {
            DbOperator::NotIn
        } else {
            DbOperator::In
        };
        let (alias, column) = match self.kind {
            ClassKind::Aspect => {
                let alias = joins.request(&JoinRequest {
                    category: JoinCategory::AspectPresence,
                    key: self.class.to_string(),
                    qname_id: None,
                    outer: false,
                });
                (alias, PhysicalColumn::AspectQNameId)
            }
            ClassKind::Type => (NODE_ALIAS.to_string(), PhysicalColumn::TypeQNameId),
        };
        let leaf = LeafCommand {
            operator,
            alias: Some(alias),
            field: Some(column.name().to_string()),
            value: self.values(),
            text_function: None,
            qname_id: None,
        };
        (leaf, joins)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundSelector {
    pub alias: String,
    pub test: TypeTest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedSelector {
    pub alias: String,
    pub leaf: LeafCommand,
}

pub fn bind_selector(
    ctx: &SchemaContext<'_>,
    selector: &Selector,
) -> Result<BoundSelector, LoweringError> {
    let class = resolve_class(ctx, &selector.class_name, false)?;
    log::debug!(
        "Selector `{}` bound to {} ({} ids)",
        selector.alias,
        class.name,
        class.ids.len()
    );
    Ok(BoundSelector {
        alias: selector.alias.clone(),
        test: TypeTest::from_class(class),
    })
}

impl BoundSelector {
    pub fn collect_joins(self, joins: JoinSet) -> (JoinedSelector, JoinSet) {
        let (leaf, joins) = self.test.collect_joins(joins);
        (
            JoinedSelector {
                alias: self.alias,
                leaf,
            },
            joins,
        )
    }
}

impl JoinedSelector {
    pub fn emit_predicate(&self, mut tokens: Vec<PredicateToken>) -> Vec<PredicateToken> {
        tokens.push(PredicateToken::Leaf(self.leaf.clone()));
        tokens
    }
}
