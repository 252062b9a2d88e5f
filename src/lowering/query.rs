//! Top-level query lowering
//!
//! Flattens the source into one active selector group, binds selectors,
//! constraint and orderings, threads a single join accumulator through all
//! three in that order, and emits the combined predicate.

use std::collections::HashSet;

use super::command::{render_predicate, DbOperator, LeafCommand, PredicateToken};
use super::constraint::{bind_constraint, JoinedConstraint};
use super::errors::LoweringError;
use super::join_collector::JoinSet;
use super::ordering::bind_ordering;
use super::selector::{bind_selector, JoinedSelector};
use super::{LoweredQuery, LoweringContext};
use crate::dictionary::{QName, SchemaContext};
use crate::query_model::{Argument, Column, JoinCondition, JoinType, Query, Selector, Source};

const NODE_ID_LOCAL_NAME: &str = "node-id";

/// Lower a query tree into join descriptors and a predicate token stream
pub fn lower_query(
    query: &Query,
    schema: &SchemaContext<'_>,
) -> Result<LoweredQuery, LoweringError> {
    let selectors = active_selectors(schema, &query.source)?;
    let ctx = LoweringContext::new(
        *schema,
        selectors.iter().map(|selector| selector.alias.clone()),
        query.store.clone(),
    );

    for column in &query.columns {
        check_column(&ctx, column)?;
    }

    // Bind everything before collecting joins so a failure emits nothing
    let bound_selectors = selectors
        .iter()
        .map(|selector| bind_selector(schema, selector))
        .collect::<Result<Vec<_>, _>>()?;
    let bound_constraint = query
        .constraint
        .as_ref()
        .map(|constraint| bind_constraint(&ctx, constraint))
        .transpose()?;
    let bound_orderings = query
        .orderings
        .iter()
        .flatten()
        .map(|ordering| bind_ordering(&ctx, ordering))
        .collect::<Result<Vec<_>, _>>()?;

    let mut joins = JoinSet::new();
    let mut joined_selectors: Vec<JoinedSelector> = Vec::with_capacity(bound_selectors.len());
    for selector in bound_selectors {
        let (joined, next) = selector.collect_joins(joins);
        joined_selectors.push(joined);
        joins = next;
    }
    let joined_constraint: Option<JoinedConstraint> = match bound_constraint {
        Some(constraint) => {
            let (joined, next) = constraint.collect_joins(joins);
            joins = next;
            Some(joined)
        }
        None => None,
    };
    let mut order_by: Vec<LeafCommand> = Vec::new();
    for ordering in bound_orderings {
        let (leaf, next) = ordering.collect_joins(joins);
        joins = next;
        if leaf.operator == DbOperator::NoOrder {
            continue;
        }
        order_by.push(leaf);
    }

    let mut predicate: Vec<PredicateToken> = Vec::new();
    for selector in &joined_selectors {
        if !predicate.is_empty() {
            predicate.push(PredicateToken::And);
        }
        predicate = selector.emit_predicate(predicate);
    }
    if let Some(constraint) = &joined_constraint {
        if !predicate.is_empty() {
            predicate.push(PredicateToken::And);
        }
        predicate = constraint.emit_predicate(predicate);
    }

    let deleted_type_id = if query.exclude_deleted {
        let id = schema.deleted_type_id();
        if id.is_none() {
            log::debug!("sys:deleted has no directory id, nothing to exclude");
        }
        id
    } else {
        None
    };

    let lowered = LoweredQuery {
        joins: joins.into_descriptors(),
        has_predicate: !predicate.is_empty(),
        has_ordering: !order_by.is_empty(),
        predicate,
        order_by,
        store: schema.tenant.base_store(&query.store),
        deleted_type_id,
        since_txn_id: query.since_txn_id,
    };

    log::info!(
        "Lowered query over {} selector(s): {} join(s), predicate `{}`",
        joined_selectors.len(),
        lowered.joins.len(),
        render_predicate(&lowered.predicate)
    );

    Ok(lowered)
}

/// Selectors describing the query's single row, validating selector joins
fn active_selectors<'q>(
    schema: &SchemaContext<'_>,
    source: &'q Source,
) -> Result<Vec<&'q Selector>, LoweringError> {
    check_source_joins(schema, source)?;
    let selectors = source.selectors();
    let mut seen = HashSet::new();
    for selector in &selectors {
        if !seen.insert(selector.alias.as_str()) {
            return Err(LoweringError::DuplicateSelector(selector.alias.clone()));
        }
    }
    Ok(selectors)
}

fn check_source_joins(schema: &SchemaContext<'_>, source: &Source) -> Result<(), LoweringError> {
    match source {
        Source::Selector(_) => Ok(()),
        Source::Join {
            left,
            right,
            join_type,
            condition,
        } => {
            if *join_type != JoinType::Inner {
                return Err(LoweringError::UnsupportedJoin(format!(
                    "{:?} joins between selectors",
                    join_type
                )));
            }
            check_join_condition(schema, left, right, condition)?;
            check_source_joins(schema, left)?;
            check_source_joins(schema, right)
        }
    }
}

fn check_join_condition(
    schema: &SchemaContext<'_>,
    left: &Source,
    right: &Source,
    condition: &JoinCondition,
) -> Result<(), LoweringError> {
    let on_side = |side: &Source, alias: &str| side.selectors().iter().any(|s| s.alias == alias);
    let sides_match = (on_side(left, &condition.left_selector)
        && on_side(right, &condition.right_selector))
        || (on_side(left, &condition.right_selector) && on_side(right, &condition.left_selector));
    if !sides_match {
        return Err(LoweringError::UnsupportedJoin(format!(
            "condition {}.{} = {}.{} does not connect both sides",
            condition.left_selector,
            condition.left_property,
            condition.right_selector,
            condition.right_property
        )));
    }

    let node_id = QName::system(NODE_ID_LOCAL_NAME);
    let namespaces = schema.dictionary.namespaces();
    for property in [&condition.left_property, &condition.right_property] {
        let is_node_id = namespaces
            .resolve(property.trim())
            .map(|qname| qname == node_id)
            .unwrap_or(false);
        if !is_node_id {
            return Err(LoweringError::UnsupportedJoin(format!(
                "selectors can only be joined on sys:{}, not `{}`",
                NODE_ID_LOCAL_NAME, property
            )));
        }
    }
    Ok(())
}

fn check_column(ctx: &LoweringContext<'_>, column: &Column) -> Result<(), LoweringError> {
    column
        .arguments
        .values()
        .try_for_each(|argument| check_argument_selectors(ctx, argument))
}

fn check_argument_selectors(
    ctx: &LoweringContext<'_>,
    argument: &Argument,
) -> Result<(), LoweringError> {
    match argument {
        Argument::Property { selector, .. } | Argument::Selector { selector } => {
            ctx.check_selector(selector)
        }
        Argument::Function { arguments, .. } => arguments
            .values()
            .try_for_each(|argument| check_argument_selectors(ctx, argument)),
        Argument::List { items } => items
            .iter()
            .try_for_each(|argument| check_argument_selectors(ctx, argument)),
        Argument::Literal { .. } => Ok(()),
    }
}
